//! Per-theme busy leases.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};

/// Set of themes with an operation in progress.
#[derive(Debug, Clone, Default)]
pub struct ThemeLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

/// Exclusive claim on a theme, released on drop.
#[derive(Debug)]
pub struct ThemeLease {
    name: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl ThemeLocks {
    /// Create an empty lock set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if the theme is already claimed.
    pub fn acquire(&self, name: &str) -> Result<ThemeLease> {
        if !lock(&self.held).insert(name.to_string()) {
            return Err(Error::Busy(name.to_string()));
        }
        Ok(ThemeLease {
            name: name.to_string(),
            held: Arc::clone(&self.held),
        })
    }

    /// Whether `name` is claimed.
    #[must_use]
    pub fn is_held(&self, name: &str) -> bool {
        lock(&self.held).contains(name)
    }
}

impl ThemeLease {
    /// The claimed theme.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ThemeLease {
    fn drop(&mut self) {
        lock(&self.held).remove(&self.name);
    }
}

fn lock(held: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    held.lock().unwrap_or_else(PoisonError::into_inner)
}
