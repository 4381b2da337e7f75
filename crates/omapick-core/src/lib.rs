//! # omapick Core Library
//!
//! `omapick-core` provides the core functionality for omapick, a local web
//! service for browsing, previewing, installing and applying Omarchy themes.
//!
//! ## Features
//!
//! - **Preview discovery**: finds a preview image for installed themes and
//!   probes GitHub for catalog themes across filenames and branches
//! - **Preview cache**: normalized JPEG artifacts, atomic writes, request
//!   coalescing and bulk resync
//! - **Install/apply jobs**: external commands tracked step by step, with a
//!   per-theme busy guard
//!
//! ## Modules
//!
//! - [`catalog`] - Official theme catalog and light/dark classification
//! - [`config`] - Configuration management
//! - [`hyprland`] - Rewrites deprecated Hyprland window rules
//! - [`inventory`] - Installed themes and the active theme
//! - [`orchestrator`] - Install/apply jobs and the command runner seam
//! - [`preview`] - Preview resolution, transcoding and caching
//! - [`service`] - Wires the components together from a [`config::Config`]
//! - [`theme`] - Shared theme types and name validation
//! - [`web`] - HTTP API
//!
//! ## Example
//!
//! ```rust,ignore
//! use omapick_core::{config::Config, service::ThemeService};
//!
//! let service = ThemeService::from_config(&Config::load()?)?;
//! for theme in service.installed() {
//!     println!("{} ({})", theme.name, theme.mode);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod hyprland;
pub mod inventory;
pub mod orchestrator;
pub mod preview;
pub mod service;
pub mod theme;

#[cfg(feature = "web")]
pub mod web;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// First port tried when binding the web server
pub const DEFAULT_START_PORT: u16 = 8420;

/// Number of consecutive ports tried before giving up
pub const DEFAULT_PORT_ATTEMPTS: u16 = 100;

/// Maximum width of a cached preview, in pixels
pub const DEFAULT_PREVIEW_MAX_WIDTH: u32 = 640;

/// JPEG quality used for cached previews
pub const DEFAULT_PREVIEW_QUALITY: u8 = 80;

/// Remote bodies at or below this size are not treated as previews
pub const DEFAULT_MIN_REMOTE_BYTES: usize = 1000;

/// Remote bodies above this size are abandoned mid-download
pub const DEFAULT_MAX_REMOTE_BYTES: usize = 20 * 1024 * 1024;
