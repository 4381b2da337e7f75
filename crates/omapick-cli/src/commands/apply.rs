//! Apply command implementation.

use anyhow::{bail, Result};
use omapick_core::config::Config;
use omapick_core::service::ThemeService;

use super::ApplyArgs;

/// Run the apply command.
pub async fn run(args: ApplyArgs, config: Config) -> Result<()> {
    let service = ThemeService::from_config(&config)?;
    let handle = service.orchestrator().apply(&args.name)?;

    println!("Applying {}", args.name);
    let snapshot = super::follow_job(&handle).await;

    if !snapshot.succeeded() {
        bail!(
            "failed to apply {}: {}",
            args.name,
            snapshot.error.unwrap_or_default()
        );
    }
    println!("Theme '{}' applied.", args.name);
    Ok(())
}
