//! Preview cache.
//!
//! Artifacts are JPEG files named `<origin>_<name>.jpg`. Each one is written
//! to a temporary file in the cache directory and renamed into place, so a
//! reader never sees a partial image.
//!
//! Concurrent misses for the same key share one resolution through a
//! per-key registry of [`OnceCell`]s. Clean misses are remembered in memory
//! until the key is refreshed; transient failures are not remembered.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::OnceCell;

use super::transcode::transcode;
use super::{PreviewKey, PreviewResolver, Resolution};
use crate::catalog::Catalog;
use crate::config::PreviewConfig;
use crate::error::{Error, Result};
use crate::inventory::ThemeInventory;
use crate::theme::{self, Origin};

/// Per-theme result of a bulk sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Preview fetched and stored
    Ok,
    /// No preview found, or the fetch failed
    Failed,
    /// Already cached and not forced
    Skipped,
}

/// Result of a bulk sync.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Status per theme name
    pub results: BTreeMap<String, SyncStatus>,
}

impl SyncReport {
    /// Number of themes with the given status.
    #[must_use]
    pub fn count(&self, status: SyncStatus) -> usize {
        self.results.values().filter(|s| **s == status).count()
    }
}

#[derive(Debug, Clone)]
enum Lookup {
    Stored(PathBuf),
    Missing,
    Failed(String),
}

/// Shared handle to the preview cache.
#[derive(Debug, Clone)]
pub struct PreviewCache {
    inner: Arc<CacheInner>,
}

#[derive(Debug)]
struct CacheInner {
    dir: PathBuf,
    resolver: PreviewResolver,
    catalog: Arc<Catalog>,
    inventory: ThemeInventory,
    max_width: u32,
    quality: u8,
    concurrency: usize,
    in_flight: Mutex<HashMap<PreviewKey, Arc<OnceCell<Lookup>>>>,
    negative: Mutex<HashSet<PreviewKey>>,
    syncing: AtomicBool,
}

struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PreviewCache {
    /// Create a cache storing artifacts in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the resolver's
    /// HTTP client cannot be built.
    pub fn new(
        dir: impl Into<PathBuf>,
        config: &PreviewConfig,
        catalog: Arc<Catalog>,
        inventory: ThemeInventory,
    ) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let resolver = PreviewResolver::new(config, Arc::clone(&catalog), inventory.clone())?;

        Ok(Self {
            inner: Arc::new(CacheInner {
                dir,
                resolver,
                catalog,
                inventory,
                max_width: config.max_width,
                quality: config.quality,
                concurrency: config.sync_concurrency.max(1),
                in_flight: Mutex::new(HashMap::new()),
                negative: Mutex::new(HashSet::new()),
                syncing: AtomicBool::new(false),
            }),
        })
    }

    /// The cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Where the artifact for `key` lives.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThemeName`] if the name is not path-safe.
    pub fn path_for(&self, key: &PreviewKey) -> Result<PathBuf> {
        theme::validate_name(&key.name)?;
        Ok(self.inner.dir.join(key.file_name()))
    }

    /// Whether an artifact exists for `key`.
    #[must_use]
    pub fn is_cached(&self, key: &PreviewKey) -> bool {
        self.path_for(key).is_ok_and(|path| path.is_file())
    }

    /// Return the artifact for `key`, resolving and storing it on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThemeNotFound`] or [`Error::UnknownTheme`] if the
    /// theme is not installed or not in the catalog,
    /// [`Error::PreviewNotFound`] if the theme has no preview (including
    /// undecodable images) and [`Error::TransientFetch`] if the lookup failed
    /// and may succeed later.
    pub async fn get_or_fetch(&self, key: &PreviewKey) -> Result<PathBuf> {
        let path = self.path_for(key)?;
        if path.is_file() {
            return Ok(path);
        }
        // Unknown themes are never remembered, so one installed later is
        // picked up on the next request.
        self.ensure_known(key)?;
        if self.is_negative(key) {
            return Err(not_found(key));
        }

        let cell = {
            let mut in_flight = lock(&self.inner.in_flight);
            Arc::clone(in_flight.entry(key.clone()).or_default())
        };

        let lookup = cell
            .get_or_init(|| async {
                // A previous flight may have finished between the checks above
                // and joining the registry.
                if path.is_file() {
                    return Lookup::Stored(path.clone());
                }
                if self.is_negative(key) {
                    return Lookup::Missing;
                }
                self.fetch_and_store(key).await
            })
            .await
            .clone();

        {
            let mut in_flight = lock(&self.inner.in_flight);
            if in_flight.get(key).is_some_and(|c| Arc::ptr_eq(c, &cell)) {
                in_flight.remove(key);
            }
        }

        into_result(key, lookup)
    }

    /// Resolve `key` again and replace any stored artifact.
    ///
    /// The negative entry for `key` is cleared first. When no preview is
    /// found an existing artifact is left in place.
    ///
    /// # Errors
    ///
    /// Same as [`PreviewCache::get_or_fetch`].
    pub async fn refresh(&self, key: &PreviewKey) -> Result<PathBuf> {
        self.path_for(key)?;
        lock(&self.inner.negative).remove(key);
        self.ensure_known(key)?;
        let lookup = self.fetch_and_store(key).await;
        into_result(key, lookup)
    }

    /// Delete the artifact for `key` and forget any negative result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub async fn evict(&self, key: &PreviewKey) -> Result<()> {
        let path = self.path_for(key)?;
        lock(&self.inner.negative).remove(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Refresh the preview of every installed theme.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if another bulk sync is running.
    pub async fn resync_installed(&self) -> Result<SyncReport> {
        let _guard = self.begin_sync()?;
        Ok(self.sync_installed_unguarded().await)
    }

    /// Fetch previews for catalog themes that are not installed.
    ///
    /// Cached entries are skipped unless `force` is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if another bulk sync is running.
    pub async fn sync_available(&self, force: bool) -> Result<SyncReport> {
        let _guard = self.begin_sync()?;
        Ok(self.sync_available_unguarded(force).await)
    }

    /// [`resync_installed`](Self::resync_installed) followed by
    /// [`sync_available`](Self::sync_available) under one guard.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if another bulk sync is running.
    pub async fn sync_all(&self, force: bool) -> Result<SyncReport> {
        let _guard = self.begin_sync()?;
        let mut report = self.sync_installed_unguarded().await;
        report
            .results
            .extend(self.sync_available_unguarded(force).await.results);
        Ok(report)
    }

    async fn sync_installed_unguarded(&self) -> SyncReport {
        let names = self.inner.inventory.installed_names();
        tracing::info!("Resyncing previews for {} installed theme(s)", names.len());
        let keys = names.into_iter().map(PreviewKey::installed).collect();
        self.sync_keys(keys, true).await
    }

    async fn sync_available_unguarded(&self, force: bool) -> SyncReport {
        let installed = self.inner.inventory.installed_names();
        let keys: Vec<_> = self
            .inner
            .catalog
            .iter()
            .filter(|(name, _)| !installed.contains(*name))
            .map(|(name, _)| PreviewKey::available(name))
            .collect();
        tracing::info!("Syncing previews for {} available theme(s)", keys.len());
        self.sync_keys(keys, force).await
    }

    async fn sync_keys(&self, keys: Vec<PreviewKey>, force: bool) -> SyncReport {
        let results = stream::iter(keys)
            .map(|key| async move {
                if !force && self.is_cached(&key) {
                    return (key.name, SyncStatus::Skipped);
                }
                match self.refresh(&key).await {
                    Ok(_) => (key.name, SyncStatus::Ok),
                    Err(e) => {
                        tracing::warn!("Preview sync failed for {}: {}", key.name, e);
                        (key.name, SyncStatus::Failed)
                    }
                }
            })
            .buffer_unordered(self.inner.concurrency)
            .collect::<BTreeMap<_, _>>()
            .await;

        let report = SyncReport { results };
        tracing::info!(
            "Preview sync finished: {} ok, {} failed, {} skipped",
            report.count(SyncStatus::Ok),
            report.count(SyncStatus::Failed),
            report.count(SyncStatus::Skipped)
        );
        report
    }

    fn begin_sync(&self) -> Result<SyncGuard<'_>> {
        self.inner
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy("preview sync".to_string()))?;
        Ok(SyncGuard(&self.inner.syncing))
    }

    fn ensure_known(&self, key: &PreviewKey) -> Result<()> {
        match key.origin {
            Origin::Installed if !self.inner.inventory.is_installed(&key.name) => {
                Err(Error::ThemeNotFound(key.name.clone()))
            }
            Origin::Available if !self.inner.catalog.contains(&key.name) => {
                Err(Error::UnknownTheme(key.name.clone()))
            }
            _ => Ok(()),
        }
    }

    fn is_negative(&self, key: &PreviewKey) -> bool {
        lock(&self.inner.negative).contains(key)
    }

    async fn fetch_and_store(&self, key: &PreviewKey) -> Lookup {
        let raw = match self.inner.resolver.resolve(key).await {
            Ok(Resolution::Found(raw)) => raw,
            Ok(Resolution::NotFound) => {
                lock(&self.inner.negative).insert(key.clone());
                return Lookup::Missing;
            }
            Err(Error::TransientFetch(reason)) => return Lookup::Failed(reason),
            Err(e) => return Lookup::Failed(e.to_string()),
        };

        match self.store(key, raw.bytes).await {
            Ok(path) => {
                tracing::debug!("Cached preview for {} from {}", key.name, raw.location);
                Lookup::Stored(path)
            }
            Err(Error::Transcode(reason)) => {
                tracing::warn!("Transcode error for {} ({}): {}", key.name, raw.location, reason);
                lock(&self.inner.negative).insert(key.clone());
                Lookup::Missing
            }
            Err(e) => Lookup::Failed(e.to_string()),
        }
    }

    async fn store(&self, key: &PreviewKey, bytes: Vec<u8>) -> Result<PathBuf> {
        let path = self.path_for(key)?;
        let dir = self.inner.dir.clone();
        let (max_width, quality) = (self.inner.max_width, self.inner.quality);

        tokio::task::spawn_blocking(move || {
            let jpeg = transcode(&bytes, max_width, quality)?;
            std::fs::create_dir_all(&dir)?;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&jpeg)?;
            tmp.persist(&path).map_err(|e| Error::Io(e.error))?;
            Ok(path)
        })
        .await
        .map_err(|e| Error::Internal(format!("preview store panicked: {e}")))?
    }
}

fn into_result(key: &PreviewKey, lookup: Lookup) -> Result<PathBuf> {
    match lookup {
        Lookup::Stored(path) => Ok(path),
        Lookup::Missing => Err(not_found(key)),
        Lookup::Failed(reason) => Err(Error::TransientFetch(reason)),
    }
}

fn not_found(key: &PreviewKey) -> Error {
    Error::PreviewNotFound {
        theme: key.name.clone(),
        origin: key.origin,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn setup() -> (TempDir, PreviewCache) {
        let temp_dir = TempDir::new().unwrap();
        let themes = temp_dir.path().join("themes");
        std::fs::create_dir_all(themes.join("nord")).unwrap();
        std::fs::write(themes.join("nord").join("preview.png"), png(800, 400)).unwrap();
        std::fs::create_dir_all(themes.join("bare")).unwrap();
        std::fs::create_dir_all(themes.join("broken")).unwrap();
        std::fs::write(themes.join("broken").join("preview.png"), b"not a png").unwrap();

        let inventory = ThemeInventory::new(&themes, temp_dir.path().join("current"));
        let cache = PreviewCache::new(
            temp_dir.path().join("cache"),
            &PreviewConfig::default(),
            Arc::new(Catalog::default()),
            inventory,
        )
        .unwrap();
        (temp_dir, cache)
    }

    #[tokio::test]
    async fn test_installed_preview_is_cached() {
        let (_temp_dir, cache) = setup();
        let key = PreviewKey::installed("nord");

        let path = cache.get_or_fetch(&key).await.unwrap();
        assert!(path.ends_with("installed_nord.jpg"));
        assert!(cache.is_cached(&key));

        let img = image::open(&path).unwrap();
        assert_eq!(image::GenericImageView::dimensions(&img), (640, 320));
    }

    #[tokio::test]
    async fn test_missing_preview_is_not_found() {
        let (_temp_dir, cache) = setup();
        let err = cache.get_or_fetch(&PreviewKey::installed("bare")).await.unwrap_err();
        assert!(matches!(err, Error::PreviewNotFound { .. }));
        assert!(cache.is_negative(&PreviewKey::installed("bare")));
    }

    #[tokio::test]
    async fn test_unknown_themes_are_not_remembered() {
        let (_temp_dir, cache) = setup();
        for i in 0..50 {
            let installed = PreviewKey::installed(format!("ghost{i}"));
            let available = PreviewKey::available(format!("nocat{i}"));
            assert!(matches!(
                cache.get_or_fetch(&installed).await,
                Err(Error::ThemeNotFound(_))
            ));
            assert!(matches!(
                cache.get_or_fetch(&available).await,
                Err(Error::UnknownTheme(_))
            ));
        }
        assert!(lock(&cache.inner.negative).is_empty());
        assert!(lock(&cache.inner.in_flight).is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_preview_is_not_found() {
        let (_temp_dir, cache) = setup();
        let key = PreviewKey::installed("broken");
        assert!(matches!(
            cache.get_or_fetch(&key).await,
            Err(Error::PreviewNotFound { .. })
        ));
        assert!(!cache.is_cached(&key));
    }

    #[tokio::test]
    async fn test_invalid_name_is_rejected() {
        let (_temp_dir, cache) = setup();
        assert!(matches!(
            cache.get_or_fetch(&PreviewKey::installed("../nord")).await,
            Err(Error::InvalidThemeName(_))
        ));
    }

    #[tokio::test]
    async fn test_evict_removes_artifact() {
        let (_temp_dir, cache) = setup();
        let key = PreviewKey::installed("nord");
        cache.get_or_fetch(&key).await.unwrap();

        cache.evict(&key).await.unwrap();
        assert!(!cache.is_cached(&key));
        cache.evict(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_second_sync_is_busy() {
        let (_temp_dir, cache) = setup();
        let guard = cache.begin_sync().unwrap();
        assert!(matches!(cache.resync_installed().await, Err(Error::Busy(_))));
        drop(guard);

        let report = cache.resync_installed().await.unwrap();
        assert_eq!(report.results.get("nord"), Some(&SyncStatus::Ok));
        assert_eq!(report.results.get("bare"), Some(&SyncStatus::Failed));
        assert_eq!(report.count(SyncStatus::Failed), 2);
    }
}
