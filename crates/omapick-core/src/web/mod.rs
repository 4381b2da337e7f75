//! Local web server for omapick.
//!
//! The server binds to loopback by default and exposes a JSON API for a
//! separate front end. It takes the first free port from
//! `server.start_port` and records it in the port file so launchers can find
//! it.
//!
//! ## API Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | /health | Liveness check |
//! | GET | /api/themes | Installed themes |
//! | GET | /api/available | Catalog themes not installed |
//! | POST | /api/themes/apply | Apply a theme |
//! | POST | /api/themes/install | Install a theme |
//! | GET | /api/jobs/{id} | Background install progress |
//! | DELETE | /api/themes/{name} | Remove a theme |
//! | GET | /api/themes/{name}/preview | Installed preview (JPEG) |
//! | GET | /api/available/{name}/preview | Remote preview (JPEG) |
//! | POST | /api/sync-previews | Refresh previews |

pub mod error;
pub mod handlers;
pub mod state;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::service::ThemeService;

pub use state::{AppState, SharedState};

/// Build the API router.
pub fn build_router(state: SharedState) -> Router {
    let api = Router::new()
        .route("/themes", get(handlers::list_themes))
        .route("/themes/apply", post(handlers::apply_theme))
        .route("/themes/install", post(handlers::install_theme))
        .route("/themes/{name}", delete(handlers::delete_theme))
        .route("/themes/{name}/preview", get(handlers::installed_preview))
        .route("/available", get(handlers::list_available))
        .route("/available/{name}/preview", get(handlers::available_preview))
        .route("/jobs/{id}", get(handlers::get_job))
        .route("/sync-previews", post(handlers::sync_previews));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The web server instance.
#[derive(Debug)]
pub struct WebServer {
    service: ThemeService,
    config: ServerConfig,
    port_file: PathBuf,
    port: Option<u16>,
}

impl WebServer {
    /// Create a server for `service`.
    #[must_use]
    pub fn new(service: ThemeService, config: ServerConfig, port_file: impl Into<PathBuf>) -> Self {
        Self {
            service,
            config,
            port_file: port_file.into(),
            port: None,
        }
    }

    /// Bind exactly `port` instead of scanning from the configured start.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Bind, serve until Ctrl-C, then remove the port file.
    ///
    /// # Errors
    ///
    /// Returns an error if no port can be bound or the server fails.
    pub async fn run(self) -> Result<()> {
        let (start, attempts) = match self.port {
            Some(port) => (port, 1),
            None => (self.config.start_port, self.config.port_attempts),
        };
        let listener = bind_first_free(&self.config.host, start, attempts).await?;
        let addr = listener.local_addr()?;

        write_port_file(&self.port_file, addr.port())?;
        tracing::info!("Listening on http://{}", addr);

        if self.config.warmup {
            spawn_warmup(self.service.clone(), self.config.warmup_delay);
        }

        let app = build_router(AppState::new(self.service).shared());
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if let Err(e) = std::fs::remove_file(&self.port_file) {
            tracing::debug!("Could not remove port file: {}", e);
        }
        tracing::info!("Server stopped");
        Ok(())
    }
}

/// Bind the first free port in `start..start + attempts` on `host`.
///
/// # Errors
///
/// Returns an error if the host is not an IP address or every port is taken.
pub async fn bind_first_free(host: &str, start: u16, attempts: u16) -> Result<TcpListener> {
    let ip: std::net::IpAddr = host.parse().map_err(|_| Error::InvalidConfig {
        key: "server.host".to_string(),
        reason: format!("'{host}' is not an IP address"),
    })?;

    let mut last_err = None;
    for offset in 0..attempts {
        let Some(port) = start.checked_add(offset) else {
            break;
        };
        match TcpListener::bind(SocketAddr::new(ip, port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) => {
                tracing::debug!("Port {} unavailable: {}", port, e);
                last_err = Some(e);
            }
        }
    }

    Err(Error::Io(last_err.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::AddrInUse, "no ports to try")
    })))
}

/// Record the bound port as decimal text.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_port_file(path: &Path, port: u16) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, port.to_string())?;
    Ok(())
}

fn spawn_warmup(service: ThemeService, delay: std::time::Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match service.cache().resync_installed().await {
            Ok(report) => tracing::info!("Warmed {} installed preview(s)", report.results.len()),
            Err(e) => tracing::debug!("Skipping preview warmup: {}", e),
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_bind_skips_taken_port() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        match bind_first_free("127.0.0.1", port, 5).await {
            Ok(listener) => assert_ne!(listener.local_addr().unwrap().port(), port),
            // Neighbouring ports can be taken on busy CI hosts.
            Err(e) => assert!(matches!(e, Error::Io(_))),
        }
        assert!(bind_first_free("127.0.0.1", port, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_bind_rejects_bad_host() {
        assert!(matches!(
            bind_first_free("localhost:80", 8420, 1).await,
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_write_port_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(".port");
        write_port_file(&path, 8421).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "8421");
    }
}
