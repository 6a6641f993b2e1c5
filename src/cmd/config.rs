//! Configuration loading and the `agentflow config` commands.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

use agentflow::config::{AgentflowToml, CONFIG_FILE_NAME};

use super::super::{Cli, ConfigCommands};

/// Discover the config file and apply environment and CLI overrides.
pub fn load_config(cli: &Cli) -> Result<(AgentflowToml, Option<PathBuf>)> {
    let (mut config, source) = AgentflowToml::discover(cli.config.as_deref())?;
    if let Some(path) = &source {
        debug!(path = %path.display(), "Loaded configuration");
    }
    config
        .apply_env()
        .context("Invalid environment override")?;
    if cli.instant {
        config.timing.phase_delay_ms = 0;
        config.timing.task_delay_ms = 0;
    }
    Ok((config, source))
}

/// `load_config` followed by validation.
pub fn load_validated(cli: &Cli) -> Result<AgentflowToml> {
    let (config, source) = load_config(cli)?;
    config.validate().with_context(|| match &source {
        Some(path) => format!("Invalid configuration in {}", path.display()),
        None => "Invalid configuration".to_string(),
    })?;
    Ok(config)
}

pub fn cmd_config(cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            let (config, source) = load_config(cli)?;
            match source {
                Some(path) => println!("# Config file: {}", path.display()),
                None => println!("# No {} found, using defaults", CONFIG_FILE_NAME),
            }
            println!("# Effective values (with env/CLI overrides)");
            println!();
            print!("{}", config.to_toml()?);
        }
        Some(ConfigCommands::Validate) => {
            let (config, source) = load_config(cli)?;
            config.validate()?;
            match source {
                Some(path) => println!("Configuration is valid: {}", path.display()),
                None => println!("Configuration is valid (defaults)"),
            }
        }
        Some(ConfigCommands::Init { force }) => {
            let path = match &cli.config {
                Some(path) => path.clone(),
                None => std::env::current_dir()
                    .context("Failed to get current directory")?
                    .join(CONFIG_FILE_NAME),
            };
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists. Use --force to overwrite it.",
                    path.display()
                );
            }
            AgentflowToml::default().save(&path)?;
            println!("Created {}", path.display());
        }
    }
    Ok(())
}
