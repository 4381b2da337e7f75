//! CLI command definitions and handlers.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use omapick_core::config::Config;
use omapick_core::orchestrator::{JobHandle, JobSnapshot, StepStatus};

pub mod apply;
pub mod config;
pub mod install;
pub mod list;
pub mod serve;
pub mod sync;

/// Load configuration, falling back to defaults when it cannot be read.
pub fn load_config(path: Option<&Path>) -> Config {
    let result = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    result.unwrap_or_else(|e| {
        tracing::warn!("Using default configuration: {}", e);
        Config::default()
    })
}

/// Print step transitions until the job finishes.
pub async fn follow_job(handle: &JobHandle) -> JobSnapshot {
    let mut rx = handle.subscribe();
    let mut seen = vec![StepStatus::Pending; rx.borrow().steps.len()];

    loop {
        let snapshot = rx.borrow_and_update().clone();
        for (step, last) in snapshot.steps.iter().zip(seen.iter_mut()) {
            if step.status != *last {
                *last = step.status;
                match step.status {
                    StepStatus::Active => println!("  .. {}", step.name),
                    StepStatus::Complete => println!("  ok {}", step.name),
                    StepStatus::Failed => println!("  !! {}", step.name),
                    StepStatus::Pending => {}
                }
            }
        }
        if snapshot.is_terminal() || rx.changed().await.is_err() {
            break;
        }
    }

    handle.snapshot()
}

/// omapick - Browse, preview, install and apply Omarchy themes
#[derive(Parser)]
#[command(name = "omapick")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Detailed logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use this configuration file instead of the default
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Start the web API
    Serve(ServeArgs),

    /// List installed or available themes
    List(ListArgs),

    /// Apply an installed theme
    Apply(ApplyArgs),

    /// Install a theme from the catalog or a GitHub URL
    Install(InstallArgs),

    /// Refresh cached previews
    Sync(SyncArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for the serve command
#[derive(Parser)]
pub struct ServeArgs {
    /// Bind exactly this port instead of the first free one
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Skip the startup preview resync
    #[arg(long)]
    pub no_warmup: bool,
}

/// Arguments for the list command
#[derive(Parser)]
pub struct ListArgs {
    /// List catalog themes that are not installed
    #[arg(short, long)]
    pub available: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the apply command
#[derive(Parser)]
pub struct ApplyArgs {
    /// Installed theme name
    pub name: String,
}

/// Arguments for the install command
#[derive(Parser)]
pub struct InstallArgs {
    /// Theme name
    pub name: String,

    /// Repository URL for themes outside the catalog
    #[arg(long)]
    pub url: Option<String>,
}

/// Arguments for the sync command
#[derive(Parser)]
pub struct SyncArgs {
    /// Also fetch previews for catalog themes that are not installed
    #[arg(short, long)]
    pub available: bool,

    /// Refetch previews that are already cached
    #[arg(short, long)]
    pub force: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the config command
#[derive(Parser)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key, e.g. `preview.quality`
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Value to set
        value: String,
    },

    /// Show all configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Reset to defaults
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_install_with_url() {
        let cli = Cli::parse_from([
            "omapick",
            "install",
            "mine",
            "--url",
            "https://github.com/me/omarchy-mine-theme",
            "-v",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Command::Install(args) => {
                assert_eq!(args.name, "mine");
                assert!(args.url.is_some());
            }
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn test_load_config_falls_back_to_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();
        assert_eq!(load_config(Some(&path)).server.start_port, 8420);
    }
}
