//! Error types for omapick.
//!
//! This module provides a unified error type for all omapick operations,
//! with specific error variants for different failure modes.

use std::io;

use thiserror::Error;

use crate::theme::Origin;

/// A specialized `Result` type for omapick operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for omapick.
#[derive(Error, Debug)]
pub enum Error {
    /// No preview exists for the theme (E001)
    #[error("no preview available for {origin} theme '{theme}'")]
    PreviewNotFound {
        /// Theme name
        theme: String,
        /// Where the preview was looked for
        origin: Origin,
    },

    /// A remote preview probe failed at transport level (E002)
    #[error("preview fetch failed: {0}")]
    TransientFetch(String),

    /// Preview image could not be decoded or re-encoded (E003)
    #[error("failed to transcode preview: {0}")]
    Transcode(String),

    /// External theme command failed or could not be started (E004)
    #[error("command '{command}' failed: {reason}")]
    ExternalCommand {
        /// Program that was run
        command: String,
        /// Captured error output or spawn error
        reason: String,
    },

    /// Another operation holds the theme (E005)
    #[error("'{0}' is busy with another operation")]
    Busy(String),

    /// Theme is not installed (E006)
    #[error("theme '{0}' is not installed")]
    ThemeNotFound(String),

    /// Theme is not in the catalog (E007)
    #[error("theme '{0}' is not in the catalog")]
    UnknownTheme(String),

    /// Theme name is not filesystem-safe (E008)
    #[error("invalid theme name: {0:?}")]
    InvalidThemeName(String),

    /// Source URL is not a GitHub repository URL (E008)
    #[error("invalid theme source: {0}")]
    InvalidSource(String),

    /// Refusing to remove the active theme (E009)
    #[error("cannot remove the active theme '{0}'")]
    ActiveThemeRemoval(String),

    /// Configuration file error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Reason for invalidity
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Operation timeout
    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    /// Internal error (should not happen)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error code associated with this error, if any.
    ///
    /// Error codes follow the pattern EXXX where XXX is a 3-digit number.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::PreviewNotFound { .. } => Some("E001"),
            Self::TransientFetch(_) => Some("E002"),
            Self::Transcode(_) => Some("E003"),
            Self::ExternalCommand { .. } => Some("E004"),
            Self::Busy(_) => Some("E005"),
            Self::ThemeNotFound(_) => Some("E006"),
            Self::UnknownTheme(_) => Some("E007"),
            Self::InvalidThemeName(_) | Self::InvalidSource(_) => Some("E008"),
            Self::ActiveThemeRemoval(_) => Some("E009"),
            _ => None,
        }
    }

    /// Returns whether this error is recoverable (can be retried).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TransientFetch(_) | Self::Timeout(_) | Self::Busy(_)
        )
    }

    /// Returns a helpful suggestion for resolving the error, if applicable.
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ExternalCommand { .. } => Some(
                "Check that Omarchy is installed and the theme commands exist:\n\
                 ~/.local/share/omarchy/bin/omarchy-theme-set\n\
                 ~/.local/share/omarchy/bin/omarchy-theme-install\n\
                 Paths can be changed under [commands] in the config file.",
            ),
            Self::TransientFetch(_) => {
                Some("Check your internet connection and try again.")
            }
            Self::Busy(_) => Some("Wait for the running operation to finish and retry."),
            Self::ActiveThemeRemoval(_) => Some("Apply another theme before removing this one."),
            _ => None,
        }
    }
}
