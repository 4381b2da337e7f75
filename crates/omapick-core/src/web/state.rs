//! Application state shared by all HTTP handlers.

use std::sync::Arc;

use crate::orchestrator::JobRegistry;
use crate::service::ThemeService;

/// State behind every request.
#[derive(Debug)]
pub struct AppState {
    /// Themes, previews and jobs
    pub service: ThemeService,
    /// Background jobs not yet collected by a client
    pub jobs: JobRegistry,
}

impl AppState {
    /// Create state around a service.
    #[must_use]
    pub fn new(service: ThemeService) -> Self {
        Self {
            service,
            jobs: JobRegistry::new(),
        }
    }

    /// Wrap in an [`Arc`] for use as router state.
    #[must_use]
    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}

/// Router state type.
pub type SharedState = Arc<AppState>;
