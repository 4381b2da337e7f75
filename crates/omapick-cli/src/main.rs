//! omapick - Browse, preview, install and apply Omarchy themes
//!
//! omapick runs a small local web service that lists installed and
//! available Omarchy themes, serves compact preview images, and drives the
//! Omarchy theme commands.
//!
//! ## Quick Start
//!
//! ```bash
//! # Start the API server
//! omapick serve
//!
//! # Install and apply from the terminal
//! omapick install tokyoled
//! omapick apply tokyoled
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::Parser;

mod commands;

use commands::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = commands::load_config(cli.config.as_deref());

    match cli.command {
        Command::Serve(args) => commands::serve::run(args, config).await,
        Command::List(args) => commands::list::run(args, config),
        Command::Apply(args) => commands::apply::run(args, config).await,
        Command::Install(args) => commands::install::run(args, config).await,
        Command::Sync(args) => commands::sync::run(args, config).await,
        Command::Config(args) => commands::config::run(args, cli.config.as_deref()),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose {
        "info,omapick=debug,omapick_core=debug"
    } else {
        "warn,omapick=info,omapick_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
