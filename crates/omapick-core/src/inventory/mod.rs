//! Local theme inventory.
//!
//! Every subdirectory of the themes directory is an installed theme. The
//! active theme is whatever the `current/theme` symlink points at.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::catalog::Catalog;
use crate::config::PathsConfig;
use crate::error::{Error, Result};
use crate::theme::{self, ThemeMode};

/// An installed theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledTheme {
    /// Directory name
    pub name: String,
    /// Light or dark
    pub mode: ThemeMode,
    /// Whether this is the active theme
    pub active: bool,
}

/// View of the local themes directory.
#[derive(Debug, Clone)]
pub struct ThemeInventory {
    themes_dir: PathBuf,
    current_link: PathBuf,
}

impl ThemeInventory {
    /// Create an inventory over `themes_dir` with the active theme read from
    /// `current_link`.
    pub fn new(themes_dir: impl Into<PathBuf>, current_link: impl Into<PathBuf>) -> Self {
        Self {
            themes_dir: themes_dir.into(),
            current_link: current_link.into(),
        }
    }

    /// Create an inventory from the `[paths]` config section.
    #[must_use]
    pub fn from_config(paths: &PathsConfig) -> Self {
        Self::new(&paths.themes_dir, &paths.current_theme_link)
    }

    /// The themes directory.
    #[must_use]
    pub fn themes_dir(&self) -> &Path {
        &self.themes_dir
    }

    /// Symlink pointing at the active theme.
    #[must_use]
    pub fn current_link(&self) -> &Path {
        &self.current_link
    }

    /// Directory of a theme, whether or not it exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThemeName`] if `name` is not a single path
    /// component.
    pub fn theme_dir(&self, name: &str) -> Result<PathBuf> {
        theme::validate_name(name)?;
        Ok(self.themes_dir.join(name))
    }

    /// Whether a theme directory exists. Invalid names are never installed.
    #[must_use]
    pub fn is_installed(&self, name: &str) -> bool {
        self.theme_dir(name).is_ok_and(|dir| dir.is_dir())
    }

    /// Names of all installed themes. A missing themes directory yields an
    /// empty set.
    #[must_use]
    pub fn installed_names(&self) -> BTreeSet<String> {
        let Ok(entries) = std::fs::read_dir(&self.themes_dir) else {
            return BTreeSet::new();
        };

        entries
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect()
    }

    /// Name of the active theme, if the current-theme link exists.
    #[must_use]
    pub fn active_theme(&self) -> Option<String> {
        let meta = std::fs::symlink_metadata(&self.current_link).ok()?;
        if !meta.file_type().is_symlink() {
            return None;
        }

        let target = std::fs::canonicalize(&self.current_link)
            .or_else(|_| std::fs::read_link(&self.current_link))
            .ok()?;
        target
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToString::to_string)
    }

    /// All installed themes sorted by name.
    #[must_use]
    pub fn list_installed(&self, catalog: &Catalog) -> Vec<InstalledTheme> {
        let active = self.active_theme();
        self.installed_names()
            .into_iter()
            .map(|name| InstalledTheme {
                mode: catalog.mode(&name),
                active: active.as_deref() == Some(name.as_str()),
                name,
            })
            .collect()
    }

    /// Delete an installed theme's directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThemeNotFound`] if the theme is not installed,
    /// [`Error::ActiveThemeRemoval`] if it is the active theme, or an I/O
    /// error if deletion fails.
    pub fn remove(&self, name: &str) -> Result<()> {
        let dir = self.theme_dir(name)?;
        if !dir.is_dir() {
            return Err(Error::ThemeNotFound(name.to_string()));
        }
        if self.active_theme().as_deref() == Some(name) {
            return Err(Error::ActiveThemeRemoval(name.to_string()));
        }

        std::fs::remove_dir_all(&dir)?;
        tracing::info!("Removed theme {}", name);
        Ok(())
    }
}
