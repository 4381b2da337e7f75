//! Preview resolution and caching against a local fake GitHub.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{dimensions, png_bytes, FakeGithub, Reply, TestEnv};
use omapick_core::preview::{PreviewKey, SyncStatus};
use omapick_core::Error;

const REPO: &str = "acme/omarchy-remote-theme";
const REPO_URL: &str = "https://github.com/acme/omarchy-remote-theme";

async fn remote_env() -> (TestEnv, FakeGithub) {
    let github = FakeGithub::start().await;
    let mut env = TestEnv::new();
    env.use_github(&github);
    env.add_catalog("remote", REPO_URL);
    (env, github)
}

#[tokio::test]
async fn test_installed_preview_follows_candidate_order_and_is_resized() {
    let env = TestEnv::new();
    env.create_theme(
        "nord",
        &[
            ("screenshot.png", png_bytes(100, 100)),
            ("theme.png", png_bytes(1280, 720)),
        ],
    );
    let service = env.service();
    let key = PreviewKey::installed("nord");

    let path = service.cache().get_or_fetch(&key).await.unwrap();
    assert!(path.ends_with("installed_nord.jpg"));
    assert_eq!(dimensions(&std::fs::read(&path).unwrap()), (640, 360));

    // A hit never goes back to the theme directory.
    std::fs::remove_dir_all(env.themes_dir().join("nord")).unwrap();
    assert_eq!(service.cache().get_or_fetch(&key).await.unwrap(), path);
}

#[tokio::test]
async fn test_installed_and_available_artifacts_do_not_collide() {
    let (env, github) = remote_env().await;
    env.create_theme("remote", &[("preview.png", png_bytes(50, 40))]);
    github.raw_file(REPO, "main", "preview.png", Reply::Bytes(png_bytes(900, 300)));
    let cache = env.service().cache().clone();

    let local = cache.get_or_fetch(&PreviewKey::installed("remote")).await.unwrap();
    let remote = cache.get_or_fetch(&PreviewKey::available("remote")).await.unwrap();

    assert_ne!(local, remote);
    assert_eq!(dimensions(&std::fs::read(&local).unwrap()), (50, 40));
    assert_eq!(dimensions(&std::fs::read(&remote).unwrap()), (640, 213));
}

#[tokio::test]
async fn test_remote_lookup_falls_through_to_master() {
    let (env, github) = remote_env().await;
    github.raw_file(REPO, "master", "preview.png", Reply::Bytes(png_bytes(320, 200)));

    let path = env
        .service()
        .cache()
        .get_or_fetch(&PreviewKey::available("remote"))
        .await
        .unwrap();

    assert_eq!(dimensions(&std::fs::read(path).unwrap()), (320, 200));
    assert_eq!(github.hits(&format!("/raw/{REPO}/main/preview.png")), 1);
    assert_eq!(github.hits(&format!("/raw/{REPO}/main/preview1.png")), 1);
    assert_eq!(github.hits(&format!("/raw/{REPO}/master/preview.png")), 1);
    assert_eq!(github.hits(&format!("/raw/{REPO}/master/theme.png")), 0);
}

#[tokio::test]
async fn test_tiny_remote_bodies_are_skipped() {
    let (env, github) = remote_env().await;
    github.raw_file(REPO, "main", "preview.png", Reply::Bytes(b"tiny".to_vec()));
    github.raw_file(REPO, "main", "preview.jpg", Reply::Bytes(png_bytes(64, 64)));

    let result = env
        .service()
        .cache()
        .get_or_fetch(&PreviewKey::available("remote"))
        .await;

    assert!(result.is_ok());
    assert_eq!(github.hits(&format!("/raw/{REPO}/main/preview.jpg")), 1);
}

#[tokio::test]
async fn test_source_branch_is_tried_first() {
    let github = FakeGithub::start().await;
    let mut env = TestEnv::new();
    env.use_github(&github);
    env.add_catalog("dev", "https://github.com/acme/dev-theme/tree/dev");
    github.raw_file("acme/dev-theme", "dev", "preview.png", Reply::Bytes(png_bytes(64, 64)));

    env.service()
        .cache()
        .get_or_fetch(&PreviewKey::available("dev"))
        .await
        .unwrap();
    assert_eq!(github.total_hits(), 1);
}

#[tokio::test]
async fn test_backgrounds_listing_is_the_last_resort() {
    let (env, github) = remote_env().await;
    github.route(
        &format!("/api/repos/{REPO}/contents/backgrounds?ref=main"),
        Reply::Json(serde_json::json!([
            {"name": "notes.md", "type": "file", "download_url": github.url("/dl/notes.md")},
            {"name": "2-city.png", "type": "file", "download_url": github.url("/dl/2-city.png")},
            {"name": "1-lake.png", "type": "file", "download_url": github.url("/dl/1-lake.png")},
        ])),
    );
    github.route("/dl/1-lake.png", Reply::Bytes(png_bytes(1000, 500)));

    let path = env
        .service()
        .cache()
        .get_or_fetch(&PreviewKey::available("remote"))
        .await
        .unwrap();

    assert_eq!(dimensions(&std::fs::read(path).unwrap()), (640, 320));
    assert_eq!(github.hits("/dl/2-city.png"), 0);
}

#[tokio::test]
async fn test_clean_miss_is_not_found_and_remembered() {
    let (env, github) = remote_env().await;
    let cache = env.service().cache().clone();
    let key = PreviewKey::available("remote");

    let err = cache.get_or_fetch(&key).await.unwrap_err();
    assert!(matches!(err, Error::PreviewNotFound { .. }));

    let requests = github.total_hits();
    assert!(requests > 0);
    let err = cache.get_or_fetch(&key).await.unwrap_err();
    assert!(matches!(err, Error::PreviewNotFound { .. }));
    assert_eq!(github.total_hits(), requests);
}

#[tokio::test]
async fn test_unknown_catalog_name_is_rejected() {
    let (env, github) = remote_env().await;
    let err = env
        .service()
        .cache()
        .get_or_fetch(&PreviewKey::available("not-in-catalog"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnknownTheme(_)));
    assert_eq!(github.total_hits(), 0);
}

#[tokio::test]
async fn test_missing_theme_is_not_remembered() {
    let env = TestEnv::new();
    let service = env.service();
    let key = PreviewKey::installed("ghost");

    let err = service.cache().get_or_fetch(&key).await.unwrap_err();
    assert!(matches!(err, Error::ThemeNotFound(_)));

    env.create_theme("ghost", &[("preview.png", png_bytes(30, 30))]);
    let path = service.cache().get_or_fetch(&key).await.unwrap();
    assert_eq!(dimensions(&std::fs::read(&path).unwrap()), (30, 30));
}

#[tokio::test]
async fn test_oversized_remote_bodies_are_skipped() {
    let (mut env, github) = remote_env().await;
    env.config.preview.max_remote_bytes = 4096;
    github.raw_file(REPO, "main", "preview.png", Reply::Bytes(vec![0u8; 10_000]));
    github.raw_file(REPO, "main", "preview.jpg", Reply::Bytes(png_bytes(50, 40)));

    let path = env
        .service()
        .cache()
        .get_or_fetch(&PreviewKey::available("remote"))
        .await
        .unwrap();

    assert_eq!(dimensions(&std::fs::read(&path).unwrap()), (50, 40));
}

#[tokio::test]
async fn test_server_errors_are_transient_and_not_remembered() {
    let (env, github) = remote_env().await;
    github.raw_file(
        REPO,
        "main",
        "preview.png",
        Reply::Status(StatusCode::SERVICE_UNAVAILABLE),
    );
    let cache = env.service().cache().clone();
    let key = PreviewKey::available("remote");

    let err = cache.get_or_fetch(&key).await.unwrap_err();
    assert!(matches!(err, Error::TransientFetch(_)));
    assert!(err.is_recoverable());

    // Recovered upstream: the next request fetches again and succeeds.
    github.raw_file(REPO, "main", "preview.png", Reply::Bytes(png_bytes(64, 64)));
    assert!(cache.get_or_fetch(&key).await.is_ok());
    assert_eq!(github.hits(&format!("/raw/{REPO}/main/preview.png")), 2);
}

#[tokio::test]
async fn test_unreachable_host_is_transient() {
    let mut env = TestEnv::new();
    env.add_catalog("remote", REPO_URL);
    env.config.preview.background_fallback = false;
    env.config.preview.probe_timeout = Duration::from_secs(2);

    let err = env
        .service()
        .cache()
        .get_or_fetch(&PreviewKey::available("remote"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TransientFetch(_)));
}

#[tokio::test]
async fn test_undecodable_remote_image_is_not_found() {
    let (env, github) = remote_env().await;
    github.raw_file(REPO, "main", "preview.png", Reply::Bytes(vec![0xAB; 4096]));
    let cache = env.service().cache().clone();
    let key = PreviewKey::available("remote");

    let err = cache.get_or_fetch(&key).await.unwrap_err();
    assert!(matches!(err, Error::PreviewNotFound { .. }));
    assert!(!cache.is_cached(&key));
}

#[tokio::test]
async fn test_concurrent_misses_share_one_resolution() {
    let (env, github) = remote_env().await;
    github.raw_file(REPO, "main", "preview.png", Reply::Bytes(png_bytes(800, 600)));
    github.set_delay(Duration::from_millis(200));
    let cache = env.service().cache().clone();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_or_fetch(&PreviewKey::available("remote")).await })
        })
        .collect();

    let mut paths = Vec::new();
    for task in tasks {
        paths.push(task.await.unwrap().unwrap());
    }

    assert!(paths.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(github.hits(&format!("/raw/{REPO}/main/preview.png")), 1);
    assert_eq!(github.total_hits(), 1);
}

#[tokio::test]
async fn test_resync_installed_replaces_stale_artifacts() {
    let env = TestEnv::new();
    env.create_theme("nord", &[("preview.png", png_bytes(100, 100))]);
    env.create_theme("empty", &[]);
    let cache = env.service().cache().clone();
    let key = PreviewKey::installed("nord");
    let path = cache.get_or_fetch(&key).await.unwrap();

    env.create_theme("nord", &[("preview.png", png_bytes(200, 50))]);
    let report = cache.resync_installed().await.unwrap();

    assert_eq!(report.results.get("nord"), Some(&SyncStatus::Ok));
    assert_eq!(report.results.get("empty"), Some(&SyncStatus::Failed));
    assert_eq!(dimensions(&std::fs::read(&path).unwrap()), (200, 50));
}

#[tokio::test]
async fn test_sync_available_skips_cached_unless_forced() {
    let (mut env, github) = remote_env().await;
    env.add_catalog("other", "https://github.com/acme/other");
    env.add_catalog("local", "https://github.com/acme/local");
    env.create_theme("local", &[]);
    github.raw_file(REPO, "main", "preview.png", Reply::Bytes(png_bytes(64, 64)));
    github.raw_file("acme/other", "main", "preview.png", Reply::Bytes(png_bytes(64, 64)));
    let cache = env.service().cache().clone();

    cache.get_or_fetch(&PreviewKey::available("remote")).await.unwrap();

    let report = cache.sync_available(false).await.unwrap();
    assert_eq!(report.results.get("remote"), Some(&SyncStatus::Skipped));
    assert_eq!(report.results.get("other"), Some(&SyncStatus::Ok));
    assert!(!report.results.contains_key("local"));

    let report = cache.sync_available(true).await.unwrap();
    assert_eq!(report.results.get("remote"), Some(&SyncStatus::Ok));
    assert_eq!(report.count(SyncStatus::Skipped), 0);
}

#[tokio::test]
async fn test_refresh_clears_negative_entry() {
    let env = TestEnv::new();
    env.create_theme("late", &[]);
    let cache = env.service().cache().clone();
    let key = PreviewKey::installed("late");

    assert!(cache.get_or_fetch(&key).await.is_err());
    env.create_theme("late", &[("preview.png", png_bytes(30, 30))]);
    assert!(cache.get_or_fetch(&key).await.is_err());

    assert!(cache.refresh(&key).await.is_ok());
    assert!(cache.get_or_fetch(&key).await.is_ok());
}
