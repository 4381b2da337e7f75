//! List command implementation.

use anyhow::Result;
use omapick_core::config::Config;
use omapick_core::service::ThemeService;

use super::ListArgs;

/// Run the list command.
pub fn run(args: ListArgs, config: Config) -> Result<()> {
    let service = ThemeService::from_config(&config)?;

    if args.available {
        let themes = service.available();
        if args.json {
            println!("{}", serde_json::to_string_pretty(&themes)?);
            return Ok(());
        }
        if themes.is_empty() {
            println!("Every catalog theme is installed.");
        }
        for theme in themes {
            println!("  {:<24} {:<5}  {}", theme.name, theme.mode, theme.source);
        }
        return Ok(());
    }

    let themes = service.installed();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&themes)?);
        return Ok(());
    }
    if themes.is_empty() {
        println!(
            "No themes installed in {}",
            service.inventory().themes_dir().display()
        );
    }
    for theme in themes {
        let marker = if theme.active { "*" } else { " " };
        println!("{} {:<24} {}", marker, theme.name, theme.mode);
    }

    Ok(())
}
