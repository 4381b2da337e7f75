//! Configuration management for omapick.
//!
//! This module handles loading, saving, and managing omapick configuration.
//!
//! ## Configuration File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/omapick/config.toml` |
//!
//! Every section is optional; missing keys fall back to the defaults below.
//!
//! ## Example
//!
//! ```toml
//! [server]
//! start_port = 8420
//!
//! [preview]
//! max_width = 640
//! quality = 80
//! branches = ["main", "master"]
//!
//! [catalog.extra]
//! my-theme = "https://github.com/me/omarchy-my-theme"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration struct for omapick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Web server settings
    pub server: ServerConfig,
    /// Filesystem locations
    pub paths: PathsConfig,
    /// External theme commands
    pub commands: CommandsConfig,
    /// Preview resolution and caching
    pub preview: PreviewConfig,
    /// Apply behavior
    pub apply: ApplyConfig,
    /// Catalog additions
    pub catalog: CatalogConfig,
}

/// Web server configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,
    /// First port to try
    pub start_port: u16,
    /// Number of consecutive ports to try
    pub port_attempts: u16,
    /// Resync installed previews in the background after startup
    pub warmup: bool,
    /// Delay before the startup resync
    #[serde(with = "humantime_serde")]
    pub warmup_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            start_port: crate::DEFAULT_START_PORT,
            port_attempts: crate::DEFAULT_PORT_ATTEMPTS,
            warmup: true,
            warmup_delay: Duration::from_secs(1),
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding one subdirectory per installed theme
    pub themes_dir: PathBuf,
    /// Symlink pointing at the active theme
    pub current_theme_link: PathBuf,
    /// Directory for transcoded previews
    pub cache_dir: PathBuf,
    /// File the bound port is written to
    pub port_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let omarchy = home_dir().join(".config").join("omarchy");
        Self {
            themes_dir: omarchy.join("themes"),
            current_theme_link: omarchy.join("current").join("theme"),
            cache_dir: project_dirs().map_or_else(
                || PathBuf::from("cache"),
                |dirs| dirs.cache_dir().join("previews"),
            ),
            port_file: project_dirs().map_or_else(
                || PathBuf::from(".port"),
                |dirs| dirs.data_dir().join(".port"),
            ),
        }
    }
}

/// External command configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Command that activates an installed theme (`<apply> <name>`)
    pub apply: PathBuf,
    /// Command that installs a theme from a repository (`<install> <url>`)
    pub install: PathBuf,
    /// Time limit for the apply command
    #[serde(with = "humantime_serde")]
    pub apply_timeout: Duration,
    /// Time limit for the install command
    #[serde(with = "humantime_serde")]
    pub install_timeout: Duration,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        let bin = home_dir()
            .join(".local")
            .join("share")
            .join("omarchy")
            .join("bin");
        Self {
            apply: bin.join("omarchy-theme-set"),
            install: bin.join("omarchy-theme-install"),
            apply_timeout: Duration::from_secs(30),
            install_timeout: Duration::from_secs(120),
        }
    }
}

/// Preview configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Maximum width of cached previews
    pub max_width: u32,
    /// JPEG quality of cached previews (1-100)
    pub quality: u8,
    /// File names probed in an installed theme, highest priority first
    pub local_candidates: Vec<String>,
    /// File names probed in a remote repository, highest priority first
    pub remote_candidates: Vec<String>,
    /// Branches probed after the source's own branch
    pub branches: Vec<String>,
    /// Base URL for raw repository content
    pub raw_base_url: String,
    /// Base URL for the repository contents API
    pub api_base_url: String,
    /// Look in `backgrounds/` when no named preview exists
    pub background_fallback: bool,
    /// Remote bodies at or below this size are skipped
    pub min_remote_bytes: usize,
    /// Remote bodies above this size are skipped
    pub max_remote_bytes: usize,
    /// Time limit for each remote probe
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
    /// Maximum themes processed at once during bulk sync
    pub sync_concurrency: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_width: crate::DEFAULT_PREVIEW_MAX_WIDTH,
            quality: crate::DEFAULT_PREVIEW_QUALITY,
            local_candidates: strings(&[
                "preview.png",
                "theme.png",
                "screenshot.png",
                "preview-1.png",
                "preview1.png",
                "preview_1.png",
            ]),
            remote_candidates: strings(&[
                "preview.png",
                "preview.jpg",
                "preview.jpeg",
                "theme.png",
                "theme.jpg",
                "screenshot.png",
                "screenshot.jpg",
                "preview-1.png",
                "preview1.png",
            ]),
            branches: strings(&["main", "master"]),
            raw_base_url: "https://raw.githubusercontent.com".to_string(),
            api_base_url: "https://api.github.com".to_string(),
            background_fallback: true,
            min_remote_bytes: crate::DEFAULT_MIN_REMOTE_BYTES,
            max_remote_bytes: crate::DEFAULT_MAX_REMOTE_BYTES,
            probe_timeout: Duration::from_secs(15),
            sync_concurrency: 8,
        }
    }
}

/// Apply configuration options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyConfig {
    /// Rewrite deprecated `windowrulev2` syntax in the applied theme's
    /// `hyprland.conf`
    pub patch_hyprland: bool,
}

/// Catalog configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Include the built-in list of official themes
    pub include_official: bool,
    /// Additional themes, name to repository URL
    pub extra: BTreeMap<String, String>,
    /// Additional theme names classified as light
    pub light_themes: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            include_official: true,
            extra: BTreeMap::new(),
            light_themes: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// If the configuration file doesn't exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// contains invalid values.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    ///
    /// Creates the configuration directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create config directory: {e}"))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| Error::ConfigError(format!("Failed to write config: {e}")))
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.preview.quality) {
            return Err(invalid("preview.quality", "must be between 1 and 100"));
        }
        if self.preview.max_width == 0 {
            return Err(invalid("preview.max_width", "must be greater than 0"));
        }
        if self.preview.max_remote_bytes <= self.preview.min_remote_bytes {
            return Err(invalid(
                "preview.max_remote_bytes",
                "must be greater than preview.min_remote_bytes",
            ));
        }
        if self.preview.sync_concurrency == 0 {
            return Err(invalid("preview.sync_concurrency", "must be greater than 0"));
        }
        if self.server.port_attempts == 0 {
            return Err(invalid("server.port_attempts", "must be greater than 0"));
        }
        Ok(())
    }

    /// Get the default configuration directory path.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the full path to the configuration file.
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }
}

fn invalid(key: &str, reason: &str) -> Error {
    Error::InvalidConfig {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| (*s).to_string()).collect()
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "omapick", "omapick")
}

fn home_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(std::env::var("HOME").unwrap_or_default()),
        |dirs| dirs.home_dir().to_path_buf(),
    )
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.strip_suffix("ms")
            .map(|millis| {
                millis
                    .parse()
                    .map(Duration::from_millis)
                    .map_err(serde::de::Error::custom)
            })
            .or_else(|| {
                s.strip_suffix('s').map(|secs| {
                    secs.parse()
                        .map(Duration::from_secs)
                        .map_err(serde::de::Error::custom)
                })
            })
            .or_else(|| {
                s.strip_suffix('m').map(|mins| {
                    mins.parse::<u64>()
                        .map(|m| Duration::from_secs(m * 60))
                        .map_err(serde::de::Error::custom)
                })
            })
            .unwrap_or_else(|| Err(serde::de::Error::custom("invalid duration format")))
    }
}
