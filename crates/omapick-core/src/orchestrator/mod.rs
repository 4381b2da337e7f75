//! Install and apply orchestration.
//!
//! Every operation runs as a [`job`] with named steps. Steps run strictly in
//! order and each transition is published before the next step starts. A
//! per-theme lease is taken before the job is spawned, so a second operation
//! on the same theme fails with [`Error::Busy`] right away while different
//! themes proceed in parallel.
//!
//! | Job | Steps |
//! |-----|-------|
//! | install | `validate`, `install`, `preview`, `finalize` |
//! | apply | `apply`, then `patch-hyprland` when enabled |

pub mod job;
pub mod locks;
pub mod runner;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{Catalog, ThemeSource};
use crate::config::{ApplyConfig, CommandsConfig};
use crate::error::{Error, Result};
use crate::hyprland;
use crate::inventory::ThemeInventory;
use crate::preview::{PreviewCache, PreviewKey};
use crate::theme;

pub use job::{JobHandle, JobKind, JobOutcome, JobRegistry, JobSnapshot, JobStep, StepStatus};
pub use locks::{ThemeLease, ThemeLocks};
pub use runner::{CommandOutput, CommandRunner, SystemCommandRunner};

use job::JobTracker;

/// Checks the catalog entry or URL.
pub const STEP_VALIDATE: &str = "validate";
/// Runs the install command.
pub const STEP_INSTALL: &str = "install";
/// Caches the installed theme's preview.
pub const STEP_PREVIEW: &str = "preview";
/// Marks the install finished.
pub const STEP_FINALIZE: &str = "finalize";
/// Runs the apply command.
pub const STEP_APPLY: &str = "apply";
/// Rewrites deprecated Hyprland window rules.
pub const STEP_PATCH_HYPRLAND: &str = "patch-hyprland";

const HYPRLAND_CONF: &str = "hyprland.conf";

/// Runs install, apply and remove operations. Cheap to clone.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    runner: Arc<dyn CommandRunner>,
    catalog: Arc<Catalog>,
    inventory: ThemeInventory,
    cache: PreviewCache,
    locks: ThemeLocks,
    commands: CommandsConfig,
    patch_hyprland: bool,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("commands", &self.inner.commands)
            .field("patch_hyprland", &self.inner.patch_hyprland)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator.
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        catalog: Arc<Catalog>,
        inventory: ThemeInventory,
        cache: PreviewCache,
        commands: CommandsConfig,
        apply: &ApplyConfig,
    ) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                runner,
                catalog,
                inventory,
                cache,
                locks: ThemeLocks::new(),
                commands,
                patch_hyprland: apply.patch_hyprland,
            }),
        }
    }

    /// Whether an operation on `name` is in progress.
    #[must_use]
    pub fn is_busy(&self, name: &str) -> bool {
        self.inner.locks.is_held(name)
    }

    /// Start applying an installed theme.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThemeName`], [`Error::ThemeNotFound`] if the
    /// theme is not installed, or [`Error::Busy`].
    pub fn apply(&self, name: &str) -> Result<JobHandle> {
        theme::validate_name(name)?;
        if !self.inner.inventory.is_installed(name) {
            return Err(Error::ThemeNotFound(name.to_string()));
        }
        let lease = self.inner.locks.acquire(name)?;

        let mut steps = vec![STEP_APPLY];
        if self.inner.patch_hyprland {
            steps.push(STEP_PATCH_HYPRLAND);
        }
        let (tracker, handle) = JobTracker::new(JobKind::Apply, name, &steps);
        let tracker = tracker.with_lease(lease);

        let inner = Arc::clone(&self.inner);
        let name = name.to_string();
        tokio::spawn(async move {
            inner.run_apply(&tracker, &name).await;
        });

        Ok(handle)
    }

    /// Start installing a theme from the catalog or from `url_override`.
    ///
    /// An unknown theme or bad URL fails the job's `validate` step rather
    /// than this call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThemeName`] or [`Error::Busy`].
    pub fn install(&self, name: &str, url_override: Option<&str>) -> Result<JobHandle> {
        theme::validate_name(name)?;
        let lease = self.inner.locks.acquire(name)?;

        let (tracker, handle) = JobTracker::new(
            JobKind::Install,
            name,
            &[STEP_VALIDATE, STEP_INSTALL, STEP_PREVIEW, STEP_FINALIZE],
        );
        let tracker = tracker.with_lease(lease);

        let inner = Arc::clone(&self.inner);
        let name = name.to_string();
        let url_override = url_override.map(ToString::to_string);
        tokio::spawn(async move {
            inner.run_install(&tracker, &name, url_override.as_deref()).await;
        });

        Ok(handle)
    }

    /// Delete an installed theme and its cached preview.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`], [`Error::ThemeNotFound`],
    /// [`Error::ActiveThemeRemoval`] or an I/O error.
    pub async fn remove(&self, name: &str) -> Result<()> {
        theme::validate_name(name)?;
        let _lease = self.inner.locks.acquire(name)?;

        let inventory = self.inner.inventory.clone();
        let owned = name.to_string();
        tokio::task::spawn_blocking(move || inventory.remove(&owned))
            .await
            .map_err(|e| Error::Internal(format!("theme removal panicked: {e}")))??;

        if let Err(e) = self.inner.cache.evict(&PreviewKey::installed(name)).await {
            tracing::warn!("Failed to evict preview for {}: {}", name, e);
        }
        Ok(())
    }
}

impl OrchestratorInner {
    async fn run_apply(&self, tracker: &JobTracker, name: &str) {
        tracing::info!("Applying theme {}", name);

        tracker.start(STEP_APPLY);
        if let Err(reason) = self
            .run_command(&self.commands.apply, name, self.commands.apply_timeout)
            .await
        {
            tracker.fail(STEP_APPLY, reason);
            return;
        }
        tracker.complete(STEP_APPLY);

        if self.patch_hyprland {
            tracker.start(STEP_PATCH_HYPRLAND);
            let conf = self.inventory.current_link().join(HYPRLAND_CONF);
            if let Err(e) = hyprland::patch_file(&conf).await {
                tracker.fail(STEP_PATCH_HYPRLAND, e.to_string());
                return;
            }
            tracker.complete(STEP_PATCH_HYPRLAND);
        }

        tracker.succeed();
        tracing::info!("Applied theme {}", name);
    }

    async fn run_install(&self, tracker: &JobTracker, name: &str, url_override: Option<&str>) {
        tracker.start(STEP_VALIDATE);
        let source = match url_override {
            Some(url) => ThemeSource::parse(url),
            None => self
                .catalog
                .get(name)
                .cloned()
                .ok_or_else(|| Error::UnknownTheme(name.to_string())),
        };
        let source = match source {
            Ok(source) => source,
            Err(e) => {
                tracker.fail(STEP_VALIDATE, e.to_string());
                return;
            }
        };
        tracker.complete(STEP_VALIDATE);

        let repo_url = source.clone_url();
        tracing::info!("Installing theme {} from {}", name, repo_url);
        tracker.start(STEP_INSTALL);
        if let Err(reason) = self
            .run_command(&self.commands.install, &repo_url, self.commands.install_timeout)
            .await
        {
            tracker.fail(STEP_INSTALL, reason);
            return;
        }
        tracker.complete(STEP_INSTALL);

        tracker.start(STEP_PREVIEW);
        self.cache_installed_preview(name, &source).await;
        tracker.complete(STEP_PREVIEW);

        tracker.start(STEP_FINALIZE);
        tracker.complete(STEP_FINALIZE);
        tracker.succeed();
        tracing::info!("Installed theme {}", name);
    }

    /// Best effort: failures are logged and never fail the job.
    async fn cache_installed_preview(&self, name: &str, source: &ThemeSource) {
        let Some(dir) = source
            .install_dir_candidates(name)
            .into_iter()
            .find(|dir| self.inventory.is_installed(dir))
        else {
            tracing::warn!("Installed theme {} not found in {}", name, self.inventory.themes_dir().display());
            return;
        };

        match self.cache.refresh(&PreviewKey::installed(&dir)).await {
            Ok(path) => tracing::debug!("Cached preview for {} at {}", dir, path.display()),
            Err(e) => tracing::warn!("No preview cached for {}: {}", dir, e),
        }
    }

    async fn run_command(
        &self,
        program: &Path,
        arg: &str,
        timeout: Duration,
    ) -> std::result::Result<(), String> {
        let args = [arg.to_string()];
        match self.runner.run(program, &args, timeout).await {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => Err(output.error_text()),
            Err(e) => Err(e.to_string()),
        }
    }
}
