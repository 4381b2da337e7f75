//! Install/apply jobs and their step-level progress.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use super::locks::ThemeLease;

/// Progress of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not started
    Pending,
    /// Running
    Active,
    /// Finished successfully
    Complete,
    /// Finished with an error
    Failed,
}

/// A named step and its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStep {
    /// Step name
    pub name: String,
    /// Current status
    pub status: StepStatus,
}

/// What a job does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Install from a repository
    Install,
    /// Activate an installed theme
    Apply,
}

/// Overall job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobOutcome {
    /// Steps remain
    Running,
    /// Every step completed
    Succeeded,
    /// A step failed
    Failed,
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    /// Job identifier
    pub id: Uuid,
    /// Install or apply
    pub kind: JobKind,
    /// Theme the job acts on
    pub theme: String,
    /// Steps in execution order
    pub steps: Vec<JobStep>,
    /// Overall state
    pub outcome: JobOutcome,
    /// Error of the failed step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Name of the failed step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    /// When the job was created
    pub started_at: DateTime<Utc>,
    /// When the job reached a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobSnapshot {
    /// Whether the job has finished.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.outcome != JobOutcome::Running
    }

    /// Whether the job finished successfully.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcome == JobOutcome::Succeeded
    }

    /// Status of the named step.
    #[must_use]
    pub fn step(&self, name: &str) -> Option<StepStatus> {
        self.steps.iter().find(|s| s.name == name).map(|s| s.status)
    }
}

/// Write side of a job. Publishes every transition to its handles.
///
/// An attached lease is released before the terminal state is published, so
/// a waiter that sees the job finish can start the next one on that theme.
#[derive(Debug)]
pub(crate) struct JobTracker {
    tx: watch::Sender<JobSnapshot>,
    lease: Mutex<Option<ThemeLease>>,
}

impl JobTracker {
    pub(crate) fn new(kind: JobKind, theme: &str, steps: &[&str]) -> (Self, JobHandle) {
        let snapshot = JobSnapshot {
            id: Uuid::new_v4(),
            kind,
            theme: theme.to_string(),
            steps: steps
                .iter()
                .map(|name| JobStep {
                    name: (*name).to_string(),
                    status: StepStatus::Pending,
                })
                .collect(),
            outcome: JobOutcome::Running,
            error: None,
            failed_step: None,
            started_at: Utc::now(),
            finished_at: None,
        };
        let id = snapshot.id;
        let (tx, rx) = watch::channel(snapshot);
        let tracker = Self {
            tx,
            lease: Mutex::new(None),
        };
        (tracker, JobHandle { id, rx })
    }

    /// Hold `lease` until the job finishes.
    pub(crate) fn with_lease(self, lease: ThemeLease) -> Self {
        *self.lease.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(lease);
        self
    }

    pub(crate) fn start(&self, step: &str) {
        self.set_step(step, StepStatus::Active);
    }

    pub(crate) fn complete(&self, step: &str) {
        self.set_step(step, StepStatus::Complete);
    }

    pub(crate) fn fail(&self, step: &str, error: impl Into<String>) {
        let error = error.into();
        tracing::warn!("Step {} failed: {}", step, error);
        self.release();
        self.tx.send_modify(|snapshot| {
            if let Some(s) = snapshot.steps.iter_mut().find(|s| s.name == step) {
                s.status = StepStatus::Failed;
            }
            snapshot.outcome = JobOutcome::Failed;
            snapshot.failed_step = Some(step.to_string());
            snapshot.error = Some(error);
            snapshot.finished_at = Some(Utc::now());
        });
    }

    pub(crate) fn succeed(&self) {
        self.release();
        self.tx.send_modify(|snapshot| {
            snapshot.outcome = JobOutcome::Succeeded;
            snapshot.finished_at = Some(Utc::now());
        });
    }

    fn release(&self) {
        self.lease
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
    }

    fn set_step(&self, step: &str, status: StepStatus) {
        self.tx.send_modify(|snapshot| {
            if let Some(s) = snapshot.steps.iter_mut().find(|s| s.name == step) {
                s.status = status;
            }
        });
    }
}

impl Drop for JobTracker {
    fn drop(&mut self) {
        // The task ended without a verdict, e.g. it panicked.
        if !self.tx.borrow().is_terminal() {
            let active = self
                .tx
                .borrow()
                .steps
                .iter()
                .find(|s| s.status == StepStatus::Active)
                .map(|s| s.name.clone());
            let step = active.unwrap_or_else(|| "unknown".to_string());
            self.fail(&step, "job aborted");
        }
    }
}

/// Read side of a job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: Uuid,
    rx: watch::Receiver<JobSnapshot>,
}

impl JobHandle {
    /// Job identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> JobSnapshot {
        self.rx.borrow().clone()
    }

    /// Receiver notified on every transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.rx.clone()
    }

    /// Wait for the job to finish and return its final state.
    pub async fn wait(&self) -> JobSnapshot {
        let mut rx = self.rx.clone();
        let result = rx.wait_for(JobSnapshot::is_terminal).await.map(|s| (*s).clone());
        result.unwrap_or_else(|_| rx.borrow().clone())
    }
}

/// Background jobs awaiting collection by a client.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<Uuid, JobHandle>>,
}

impl JobRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a job.
    pub fn insert(&self, handle: JobHandle) {
        self.lock().insert(handle.id(), handle);
    }

    /// Snapshot of a job. A terminal snapshot is returned once, after which
    /// the job is forgotten.
    #[must_use]
    pub fn take_snapshot(&self, id: Uuid) -> Option<JobSnapshot> {
        let mut jobs = self.lock();
        let snapshot = jobs.get(&id)?.snapshot();
        if snapshot.is_terminal() {
            jobs.remove(&id);
        }
        Some(snapshot)
    }

    /// Number of tracked jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no jobs are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, JobHandle>> {
        self.jobs.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
