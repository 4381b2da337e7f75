//! Wires the catalog, inventory, preview cache and orchestrator together.

use std::sync::Arc;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::Result;
use crate::inventory::ThemeInventory;
use crate::orchestrator::{CommandRunner, Orchestrator, SystemCommandRunner};
use crate::preview::{PreviewCache, PreviewKey};
use crate::theme::ThemeMode;

/// An installed theme as listed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledSummary {
    /// Theme name
    pub name: String,
    /// Light or dark
    pub mode: ThemeMode,
    /// Whether this is the active theme
    pub active: bool,
    /// Whether a preview artifact is cached
    pub cached: bool,
}

/// A catalog theme that is not installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableSummary {
    /// Theme name
    pub name: String,
    /// Light or dark
    pub mode: ThemeMode,
    /// Repository URL
    pub source: String,
    /// Whether a preview artifact is cached
    pub cached: bool,
}

/// Everything the HTTP API and CLI need.
#[derive(Debug, Clone)]
pub struct ThemeService {
    catalog: Arc<Catalog>,
    inventory: ThemeInventory,
    cache: PreviewCache,
    orchestrator: Orchestrator,
}

impl ThemeService {
    /// Build the service with the system command runner.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog is invalid or the cache directory
    /// cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_runner(config, Arc::new(SystemCommandRunner))
    }

    /// Build the service with a custom command runner.
    ///
    /// # Errors
    ///
    /// Same as [`ThemeService::from_config`].
    pub fn with_runner(config: &Config, runner: Arc<dyn CommandRunner>) -> Result<Self> {
        let catalog = Arc::new(Catalog::from_config(&config.catalog)?);
        let inventory = ThemeInventory::from_config(&config.paths);
        let cache = PreviewCache::new(
            &config.paths.cache_dir,
            &config.preview,
            Arc::clone(&catalog),
            inventory.clone(),
        )?;
        let orchestrator = Orchestrator::new(
            runner,
            Arc::clone(&catalog),
            inventory.clone(),
            cache.clone(),
            config.commands.clone(),
            &config.apply,
        );

        tracing::debug!(
            "Service ready: {} catalog themes, themes dir {}, cache {}",
            catalog.len(),
            inventory.themes_dir().display(),
            cache.dir().display()
        );

        Ok(Self {
            catalog,
            inventory,
            cache,
            orchestrator,
        })
    }

    /// The theme catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The local inventory.
    #[must_use]
    pub fn inventory(&self) -> &ThemeInventory {
        &self.inventory
    }

    /// The preview cache.
    #[must_use]
    pub fn cache(&self) -> &PreviewCache {
        &self.cache
    }

    /// The install/apply orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Installed themes sorted by name.
    #[must_use]
    pub fn installed(&self) -> Vec<InstalledSummary> {
        self.inventory
            .list_installed(&self.catalog)
            .into_iter()
            .map(|theme| InstalledSummary {
                cached: self.cache.is_cached(&PreviewKey::installed(&theme.name)),
                name: theme.name,
                mode: theme.mode,
                active: theme.active,
            })
            .collect()
    }

    /// Catalog themes that are not installed, sorted by name.
    #[must_use]
    pub fn available(&self) -> Vec<AvailableSummary> {
        let installed = self.inventory.installed_names();
        self.catalog
            .iter()
            .filter(|(name, _)| !installed.contains(*name))
            .map(|(name, source)| AvailableSummary {
                name: name.to_string(),
                mode: self.catalog.mode(name),
                source: source.url.clone(),
                cached: self.cache.is_cached(&PreviewKey::available(name)),
            })
            .collect()
    }
}
