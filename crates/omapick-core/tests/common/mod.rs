//! Common test utilities for omapick integration tests.
//!
//! This module provides a temporary Omarchy layout, a local HTTP server
//! standing in for GitHub, and a scripted command runner.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures::future::BoxFuture;
use omapick_core::config::Config;
use omapick_core::orchestrator::{CommandOutput, CommandRunner};
use omapick_core::service::ThemeService;
use tokio::sync::Notify;

/// Temporary Omarchy layout with a matching config.
pub struct TestEnv {
    pub temp: tempfile::TempDir,
    pub config: Config,
}

impl TestEnv {
    /// Fresh layout with no themes and an empty catalog.
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("Failed to create temp directory");
        let root = temp.path();

        let mut config = Config::default();
        config.paths.themes_dir = root.join("themes");
        config.paths.current_theme_link = root.join("current").join("theme");
        config.paths.cache_dir = root.join("cache");
        config.paths.port_file = root.join(".port");
        config.commands.apply = PathBuf::from("/fake/bin/omarchy-theme-set");
        config.commands.install = PathBuf::from("/fake/bin/omarchy-theme-install");
        config.preview.min_remote_bytes = 16;
        config.preview.probe_timeout = Duration::from_secs(5);
        // Nothing listens here unless a test starts a fake server.
        config.preview.raw_base_url = "http://127.0.0.1:9/raw".to_string();
        config.preview.api_base_url = "http://127.0.0.1:9/api".to_string();
        config.catalog.include_official = false;
        config.server.warmup = false;

        std::fs::create_dir_all(&config.paths.themes_dir).expect("Failed to create themes dir");
        std::fs::create_dir_all(root.join("current")).expect("Failed to create current dir");

        Self { temp, config }
    }

    /// Point remote preview lookups at `github`.
    pub fn use_github(&mut self, github: &FakeGithub) {
        self.config.preview.raw_base_url = github.raw_base();
        self.config.preview.api_base_url = github.api_base();
    }

    /// Add a catalog entry.
    pub fn add_catalog(&mut self, name: &str, url: &str) {
        self.config
            .catalog
            .extra
            .insert(name.to_string(), url.to_string());
    }

    pub fn themes_dir(&self) -> &Path {
        &self.config.paths.themes_dir
    }

    /// Create an installed theme containing `files`.
    pub fn create_theme(&self, name: &str, files: &[(&str, Vec<u8>)]) -> PathBuf {
        create_theme(self.themes_dir(), name, files)
    }

    /// Make `name` the active theme.
    #[cfg(unix)]
    pub fn activate(&self, name: &str) {
        std::os::unix::fs::symlink(
            self.themes_dir().join(name),
            &self.config.paths.current_theme_link,
        )
        .expect("Failed to link current theme");
    }

    pub fn service(&self) -> ThemeService {
        ThemeService::from_config(&self.config).expect("Failed to build service")
    }

    pub fn service_with(&self, runner: Arc<dyn CommandRunner>) -> ThemeService {
        ThemeService::with_runner(&self.config, runner).expect("Failed to build service")
    }
}

/// Create a theme directory under `themes_dir` with the given files.
pub fn create_theme(themes_dir: &Path, name: &str, files: &[(&str, Vec<u8>)]) -> PathBuf {
    let dir = themes_dir.join(name);
    std::fs::create_dir_all(&dir).expect("Failed to create theme directory");
    for (file, content) in files {
        let path = dir.join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&path, content).expect("Failed to write theme file");
    }
    dir
}

/// Encode a solid PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([40, 80, 120]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("Failed to encode PNG");
    buf
}

/// Dimensions of an encoded image.
pub fn dimensions(bytes: &[u8]) -> (u32, u32) {
    use image::GenericImageView;
    image::load_from_memory(bytes)
        .expect("Failed to decode image")
        .dimensions()
}

// ============================================================================
// Fake GitHub
// ============================================================================

/// Canned response of the fake GitHub server.
#[derive(Clone)]
pub enum Reply {
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Status(StatusCode),
}

#[derive(Default)]
struct GithubState {
    routes: Mutex<HashMap<String, Reply>>,
    hits: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    delay: Mutex<Duration>,
}

/// Local HTTP server answering raw-content and contents-API requests.
///
/// Unknown paths answer 404.
pub struct FakeGithub {
    addr: SocketAddr,
    state: Arc<GithubState>,
}

impl FakeGithub {
    pub async fn start() -> Self {
        let state = Arc::new(GithubState::default());
        let app = Router::new()
            .fallback(github_handler)
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake GitHub");
        let addr = listener.local_addr().expect("Failed to read address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake GitHub failed");
        });

        Self { addr, state }
    }

    pub fn raw_base(&self) -> String {
        format!("http://{}/raw", self.addr)
    }

    pub fn api_base(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Answer `path` (including any query) with `reply`.
    pub fn route(&self, path: &str, reply: Reply) {
        self.state
            .routes
            .lock()
            .unwrap()
            .insert(path.to_string(), reply);
    }

    /// Serve a raw file of `owner/repo` on `branch`.
    pub fn raw_file(&self, repo: &str, branch: &str, file: &str, reply: Reply) {
        self.route(&format!("/raw/{repo}/{branch}/{file}"), reply);
    }

    /// Delay every response.
    pub fn set_delay(&self, delay: Duration) {
        *self.state.delay.lock().unwrap() = delay;
    }

    /// Requests received for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.state.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    /// All requests received.
    pub fn total_hits(&self) -> usize {
        self.state.total.load(Ordering::SeqCst)
    }
}

async fn github_handler(State(state): State<Arc<GithubState>>, uri: Uri) -> Response {
    let key = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());

    state.total.fetch_add(1, Ordering::SeqCst);
    *state.hits.lock().unwrap().entry(key.clone()).or_default() += 1;

    let delay = *state.delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let reply = state.routes.lock().unwrap().get(&key).cloned();
    match reply {
        Some(Reply::Bytes(bytes)) => bytes.into_response(),
        Some(Reply::Json(value)) => axum::Json(value).into_response(),
        Some(Reply::Status(status)) => status.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// ============================================================================
// Fake command runner
// ============================================================================

type SideEffect = Box<dyn Fn(&[String]) + Send + Sync>;

/// Scripted [`CommandRunner`]. Programs succeed unless told otherwise.
#[derive(Default)]
pub struct FakeRunner {
    failures: Mutex<HashMap<String, CommandOutput>>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
    gate: Option<Arc<Notify>>,
    side_effect: Option<SideEffect>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the program named `program` exit 1 with `stderr`.
    pub fn failing(self, program: &str, stderr: &str) -> Self {
        self.failures.lock().unwrap().insert(
            program.to_string(),
            CommandOutput {
                status_code: Some(1),
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        );
        self
    }

    /// Block every command until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Run `effect` with the arguments of every successful command.
    pub fn on_run(mut self, effect: impl Fn(&[String]) + Send + Sync + 'static) -> Self {
        self.side_effect = Some(Box::new(effect));
        self
    }

    /// Programs run so far, by file name, with their arguments.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeRunner {
    fn run<'a>(
        &'a self,
        program: &'a Path,
        args: &'a [String],
        _timeout: Duration,
    ) -> BoxFuture<'a, omapick_core::Result<CommandOutput>> {
        Box::pin(async move {
            let name = program
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            self.calls.lock().unwrap().push((name.clone(), args.to_vec()));

            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            if let Some(output) = self.failures.lock().unwrap().get(&name).cloned() {
                return Ok(output);
            }
            if let Some(effect) = &self.side_effect {
                effect(args);
            }
            Ok(CommandOutput {
                status_code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            })
        })
    }
}
