//! Config command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use omapick_core::config::Config;

use super::{ConfigAction, ConfigArgs};

/// Run the config command.
pub fn run(args: ConfigArgs, path: Option<&Path>) -> Result<()> {
    let path: PathBuf = path.map_or_else(Config::config_path, Path::to_path_buf);
    let mut config = Config::load_from(&path)?;

    match args.action {
        ConfigAction::Get { key } => match get_config_value(&config, &key) {
            Some(v) => println!("{}: {}", key, v),
            None => println!("Unknown configuration key: {}", key),
        },

        ConfigAction::Set { key, value } => {
            if set_config_value(&mut config, &key, &value)? {
                config.validate()?;
                config.save_to(&path)?;
                println!("Set {} = {}", key, value);
            } else {
                println!("Unknown configuration key: {}", key);
            }
        }

        ConfigAction::Show => {
            println!("# {}", path.display());
            println!("{}", toml::to_string_pretty(&config)?);
        }

        ConfigAction::Path => println!("{}", path.display()),

        ConfigAction::Reset => {
            Config::default().save_to(&path)?;
            println!("Configuration reset to defaults.");
        }
    }

    Ok(())
}

fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "server.host" => Some(config.server.host.clone()),
        "server.start_port" => Some(config.server.start_port.to_string()),
        "server.port_attempts" => Some(config.server.port_attempts.to_string()),
        "server.warmup" => Some(config.server.warmup.to_string()),
        "paths.themes_dir" => Some(config.paths.themes_dir.display().to_string()),
        "paths.cache_dir" => Some(config.paths.cache_dir.display().to_string()),
        "paths.current_theme_link" => {
            Some(config.paths.current_theme_link.display().to_string())
        }
        "paths.port_file" => Some(config.paths.port_file.display().to_string()),
        "commands.apply" => Some(config.commands.apply.display().to_string()),
        "commands.install" => Some(config.commands.install.display().to_string()),
        "preview.max_width" => Some(config.preview.max_width.to_string()),
        "preview.quality" => Some(config.preview.quality.to_string()),
        "preview.branches" => Some(config.preview.branches.join(",")),
        "preview.sync_concurrency" => Some(config.preview.sync_concurrency.to_string()),
        "preview.max_remote_bytes" => Some(config.preview.max_remote_bytes.to_string()),
        "apply.patch_hyprland" => Some(config.apply.patch_hyprland.to_string()),
        "catalog.include_official" => Some(config.catalog.include_official.to_string()),
        _ => None,
    }
}

fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<bool> {
    let invalid = || format!("invalid value for {key}: {value}");
    match key {
        "server.host" => config.server.host = value.to_string(),
        "server.start_port" => config.server.start_port = value.parse().with_context(invalid)?,
        "server.port_attempts" => {
            config.server.port_attempts = value.parse().with_context(invalid)?;
        }
        "server.warmup" => config.server.warmup = value.parse().with_context(invalid)?,
        "paths.themes_dir" => config.paths.themes_dir = value.into(),
        "paths.cache_dir" => config.paths.cache_dir = value.into(),
        "paths.current_theme_link" => config.paths.current_theme_link = value.into(),
        "paths.port_file" => config.paths.port_file = value.into(),
        "commands.apply" => config.commands.apply = value.into(),
        "commands.install" => config.commands.install = value.into(),
        "preview.max_width" => config.preview.max_width = value.parse().with_context(invalid)?,
        "preview.quality" => config.preview.quality = value.parse().with_context(invalid)?,
        "preview.branches" => {
            config.preview.branches = value
                .split(',')
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        "preview.sync_concurrency" => {
            config.preview.sync_concurrency = value.parse().with_context(invalid)?;
        }
        "preview.max_remote_bytes" => {
            config.preview.max_remote_bytes = value.parse().with_context(invalid)?;
        }
        "apply.patch_hyprland" => {
            config.apply.patch_hyprland = value.parse().with_context(invalid)?;
        }
        "catalog.include_official" => {
            config.catalog.include_official = value.parse().with_context(invalid)?;
        }
        _ => return Ok(false),
    }
    Ok(true)
}
