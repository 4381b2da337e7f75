//! Serve command implementation.

use anyhow::Result;
use omapick_core::config::Config;
use omapick_core::service::ThemeService;
use omapick_core::web::WebServer;

use super::ServeArgs;

/// Run the serve command.
pub async fn run(args: ServeArgs, mut config: Config) -> Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if args.no_warmup {
        config.server.warmup = false;
    }

    let service = ThemeService::from_config(&config)?;

    println!();
    println!("omapick {}", omapick_core::VERSION);
    println!("{}", "─".repeat(40));
    println!("  themes:  {}", config.paths.themes_dir.display());
    println!("  cache:   {}", config.paths.cache_dir.display());
    println!("  catalog: {} themes", service.catalog().len());
    println!();
    println!("Press Ctrl+C to stop the server.");

    let mut server = WebServer::new(service, config.server.clone(), &config.paths.port_file);
    if let Some(port) = args.port {
        server = server.with_port(port);
    }
    server.run().await?;

    Ok(())
}
