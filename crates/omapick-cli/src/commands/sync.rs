//! Sync command implementation.

use anyhow::Result;
use omapick_core::config::Config;
use omapick_core::preview::{SyncReport, SyncStatus};
use omapick_core::service::ThemeService;

use super::SyncArgs;

/// Run the sync command.
pub async fn run(args: SyncArgs, config: Config) -> Result<()> {
    let service = ThemeService::from_config(&config)?;
    let cache = service.cache();

    let report: SyncReport = if args.available {
        cache.sync_all(args.force).await?
    } else {
        cache.resync_installed().await?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for (name, status) in &report.results {
        if *status == SyncStatus::Failed {
            println!("  !! {}", name);
        }
    }
    println!(
        "{} updated, {} failed, {} skipped",
        report.count(SyncStatus::Ok),
        report.count(SyncStatus::Failed),
        report.count(SyncStatus::Skipped)
    );
    Ok(())
}
