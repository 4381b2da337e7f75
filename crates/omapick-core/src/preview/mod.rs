//! Theme preview pipeline.
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Discovery | [`resolver`] | Raw image bytes from a theme directory or GitHub |
//! | Normalization | [`transcode`] | JPEG, at most `max_width` pixels wide |
//! | Storage | [`cache`] | `<origin>_<name>.jpg` in the cache directory |
//!
//! The resolver never writes; the cache owns every artifact on disk.

pub mod cache;
pub mod resolver;
pub mod transcode;

use serde::Serialize;

use crate::theme::Origin;

pub use cache::{PreviewCache, SyncReport, SyncStatus};
pub use resolver::PreviewResolver;

/// Identifies one preview artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PreviewKey {
    /// Installed or available
    pub origin: Origin,
    /// Theme name
    pub name: String,
}

impl PreviewKey {
    /// Key for an installed theme's preview.
    pub fn installed(name: impl Into<String>) -> Self {
        Self {
            origin: Origin::Installed,
            name: name.into(),
        }
    }

    /// Key for a catalog theme's remote preview.
    pub fn available(name: impl Into<String>) -> Self {
        Self {
            origin: Origin::Available,
            name: name.into(),
        }
    }

    /// File name of the cached artifact.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}_{}.jpg", self.origin.prefix(), self.name)
    }
}

/// Undecoded preview bytes and where they came from.
#[derive(Debug, Clone)]
pub struct RawPreview {
    /// Image file contents
    pub bytes: Vec<u8>,
    /// Local path or URL, for logging
    pub location: String,
}

/// Outcome of a preview lookup that did not fail transiently.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// An image was found
    Found(RawPreview),
    /// Every candidate location was checked and none had an image
    NotFound,
}
