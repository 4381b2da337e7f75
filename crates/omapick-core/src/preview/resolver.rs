//! Preview discovery.
//!
//! Installed themes are searched on disk; catalog themes are probed on
//! GitHub across candidate file names and branches. A lookup ends in one of
//! three states: an image was found, every location was a clean miss, or
//! nothing was found and at least one probe failed at transport level. Only
//! the last is an error, so callers can retry it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{PreviewKey, RawPreview, Resolution};
use crate::catalog::{Catalog, ThemeSource};
use crate::config::PreviewConfig;
use crate::error::{Error, Result};
use crate::inventory::ThemeInventory;
use crate::theme::Origin;

const BACKGROUNDS_DIR: &str = "backgrounds";
const EXCLUDED_ROOT_IMAGES: &[&str] = &["logo.png", "icon.png"];

/// Locates raw preview bytes. Holds no mutable state.
#[derive(Debug, Clone)]
pub struct PreviewResolver {
    client: Client,
    catalog: Arc<Catalog>,
    inventory: ThemeInventory,
    config: PreviewConfig,
}

enum Probe {
    Hit(Vec<u8>),
    Miss,
    Failed(String),
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    download_url: Option<String>,
}

impl PreviewResolver {
    /// Create a resolver.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &PreviewConfig, catalog: Arc<Catalog>, inventory: ThemeInventory) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("omapick/{}", crate::VERSION))
            .timeout(config.probe_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            catalog,
            inventory,
            config: config.clone(),
        })
    }

    /// Find a preview for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransientFetch`] when nothing was found and at least
    /// one remote probe failed, [`Error::InvalidThemeName`] for unsafe names,
    /// or an I/O error if a local preview cannot be read.
    pub async fn resolve(&self, key: &PreviewKey) -> Result<Resolution> {
        match key.origin {
            Origin::Installed => self.resolve_installed(&key.name).await,
            Origin::Available => self.resolve_available(&key.name).await,
        }
    }

    async fn resolve_installed(&self, name: &str) -> Result<Resolution> {
        let dir = self.inventory.theme_dir(name)?;
        let candidates = self.config.local_candidates.clone();

        let found = tokio::task::spawn_blocking(move || find_local_preview(&dir, &candidates))
            .await
            .map_err(|e| Error::Internal(format!("preview search panicked: {e}")))?;

        let Some(path) = found else {
            tracing::debug!("No local preview for {}", name);
            return Ok(Resolution::NotFound);
        };

        let bytes = tokio::fs::read(&path).await?;
        tracing::debug!("Found local preview for {} at {}", name, path.display());
        Ok(Resolution::Found(RawPreview {
            bytes,
            location: path.display().to_string(),
        }))
    }

    async fn resolve_available(&self, name: &str) -> Result<Resolution> {
        let Some(source) = self.catalog.get(name) else {
            return Ok(Resolution::NotFound);
        };

        let branches = self.branches(source);
        let mut failures = Vec::new();

        for branch in &branches {
            for file in &self.config.remote_candidates {
                let url = source.raw_url(&self.config.raw_base_url, branch, file);
                match self.probe(&url).await {
                    Probe::Hit(bytes) => return Ok(found(bytes, url)),
                    Probe::Miss => {}
                    Probe::Failed(reason) => failures.push(reason),
                }
            }
        }

        if self.config.background_fallback {
            for branch in &branches {
                match self.probe_backgrounds(source, branch).await {
                    Probe::Hit(bytes) => {
                        let location = source.contents_url(&self.config.api_base_url, BACKGROUNDS_DIR, branch);
                        return Ok(found(bytes, location));
                    }
                    Probe::Miss => {}
                    Probe::Failed(reason) => failures.push(reason),
                }
            }
        }

        if let Some(first) = failures.first() {
            tracing::debug!("{} probe(s) failed for {}: {}", failures.len(), name, first);
            return Err(Error::TransientFetch(format!(
                "{name}: {} probe(s) failed, first: {first}",
                failures.len()
            )));
        }

        tracing::debug!("No remote preview for {}", name);
        Ok(Resolution::NotFound)
    }

    /// Source branch first, then configured branches, without repeats.
    fn branches(&self, source: &ThemeSource) -> Vec<String> {
        let mut branches: Vec<String> = Vec::new();
        for branch in source.branch.iter().chain(&self.config.branches) {
            if !branches.contains(branch) {
                branches.push(branch.clone());
            }
        }
        branches
    }

    async fn probe(&self, url: &str) -> Probe {
        let mut resp = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => return Probe::Failed(format!("{url}: {e}")),
        };

        let status = resp.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Probe::Failed(format!("{url}: HTTP {status}"));
        }
        if !status.is_success() {
            return Probe::Miss;
        }

        let max = self.config.max_remote_bytes;
        if resp.content_length().is_some_and(|len| len > max as u64) {
            tracing::debug!("Skipping {}: declared size exceeds {} bytes", url, max);
            return Probe::Miss;
        }

        let mut body = Vec::new();
        loop {
            match resp.chunk().await {
                Ok(Some(chunk)) => {
                    if body.len() + chunk.len() > max {
                        tracing::debug!("Skipping {}: body exceeds {} bytes", url, max);
                        return Probe::Miss;
                    }
                    body.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(e) => return Probe::Failed(format!("{url}: {e}")),
            }
        }

        if body.len() > self.config.min_remote_bytes {
            tracing::debug!("Probe hit {} ({} bytes)", url, body.len());
            Probe::Hit(body)
        } else {
            Probe::Miss
        }
    }

    async fn probe_backgrounds(&self, source: &ThemeSource, branch: &str) -> Probe {
        let url = source.contents_url(&self.config.api_base_url, BACKGROUNDS_DIR, branch);
        let resp = match self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return Probe::Failed(format!("{url}: {e}")),
        };

        let status = resp.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Probe::Failed(format!("{url}: HTTP {status}"));
        }
        if !status.is_success() {
            return Probe::Miss;
        }

        // A file path answers with an object rather than a list.
        let Ok(mut entries) = resp.json::<Vec<ContentEntry>>().await else {
            return Probe::Miss;
        };
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let download = entries
            .into_iter()
            .filter(|entry| entry.kind == "file" && is_preview_image(Path::new(&entry.name)))
            .find_map(|entry| entry.download_url);

        match download {
            Some(download) => self.probe(&download).await,
            None => Probe::Miss,
        }
    }
}

fn found(bytes: Vec<u8>, location: String) -> Resolution {
    Resolution::Found(RawPreview { bytes, location })
}

/// Search a theme directory for a preview image.
///
/// Order: the first of `candidates` that is a regular file, then any other
/// image in the directory root except logos and icons, then the first image
/// in `backgrounds/`. Directory listings are sorted by name.
#[must_use]
pub fn find_local_preview(dir: &Path, candidates: &[String]) -> Option<PathBuf> {
    if !dir.is_dir() {
        return None;
    }

    candidates
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .or_else(|| {
            sorted_images(dir).into_iter().find(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| !EXCLUDED_ROOT_IMAGES.contains(&name))
            })
        })
        .or_else(|| sorted_images(&dir.join(BACKGROUNDS_DIR)).into_iter().next())
}

fn sorted_images(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut images: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_preview_image(path))
        .collect();
    images.sort();
    images
}

fn is_preview_image(path: &Path) -> bool {
    mime_guess::from_path(path).first().is_some_and(|mime| {
        mime.type_() == mime_guess::mime::IMAGE
            && matches!(mime.subtype().as_str(), "png" | "jpeg" | "webp" | "gif")
    })
}
