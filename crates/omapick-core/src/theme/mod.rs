//! Shared theme types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Display mode of a theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Light background
    Light,
    /// Dark background
    Dark,
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => f.pad("light"),
            Self::Dark => f.pad("dark"),
        }
    }
}

/// Where a theme (and its preview) comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Present in the local themes directory
    Installed,
    /// Listed in the catalog, fetched from its repository
    Available,
}

impl Origin {
    /// Prefix used for cache file names.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Available => "available",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.prefix())
    }
}

/// Check that a theme name can be used as a single path component.
///
/// # Errors
///
/// Returns [`Error::InvalidThemeName`] for empty names, `.`/`..`, and names
/// containing path separators or NUL bytes.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);

    if invalid {
        return Err(Error::InvalidThemeName(name.to_string()));
    }
    Ok(())
}
