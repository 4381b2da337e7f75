//! Install command implementation.

use anyhow::{bail, Result};
use omapick_core::config::Config;
use omapick_core::service::ThemeService;

use super::InstallArgs;

/// Run the install command.
pub async fn run(args: InstallArgs, config: Config) -> Result<()> {
    let service = ThemeService::from_config(&config)?;
    let handle = service
        .orchestrator()
        .install(&args.name, args.url.as_deref())?;

    println!("Installing {}", args.name);
    let snapshot = super::follow_job(&handle).await;

    if !snapshot.succeeded() {
        bail!(
            "failed to install {} at step '{}': {}",
            args.name,
            snapshot.failed_step.unwrap_or_default(),
            snapshot.error.unwrap_or_default()
        );
    }
    println!("Theme '{}' installed.", args.name);
    Ok(())
}
