use clap::Subcommand;
use std::path::Path;
use strata_core::config::{ProviderConfig, DEFAULT_CONFIG_PATH};

use super::utils::{print_error, print_info, print_success, CliError, CliResult};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate the configuration
    Validate {
        /// Path to config file (overrides --config)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Show the effective configuration, including environment overrides
    Show {
        /// Path to config file (overrides --config)
        #[arg(short, long)]
        path: Option<String>,
    },
}

/// Loads and validates configuration from `path` (or the default location),
/// replacing the URL when one is given on the command line.
pub fn load_config(path: Option<&str>, url: Option<String>) -> CliResult<ProviderConfig> {
    let mut config = match path {
        Some(path) => ProviderConfig::from_file(path),
        None => ProviderConfig::load(),
    }
    .map_err(|e| CliError::Config(e.to_string()))?;

    if let Some(url) = url {
        config.url = url;
    }
    config.validate().map_err(CliError::Config)?;
    Ok(config)
}

pub fn handle_config_command(command: ConfigCommands, global_path: Option<&str>) -> CliResult<()> {
    match command {
        ConfigCommands::Validate { path } => {
            validate_config(path.as_deref().or(global_path).unwrap_or(DEFAULT_CONFIG_PATH))
        }
        ConfigCommands::Show { path } => {
            show_config(path.as_deref().or(global_path).unwrap_or(DEFAULT_CONFIG_PATH))
        }
    }
}

fn validate_config(file: &str) -> CliResult<()> {
    if !Path::new(file).exists() {
        print_error(&format!("Configuration file not found: {file}"));
        return Err(CliError::Config(format!("File not found: {file}")));
    }

    print_info(&format!("Loading configuration from {file}..."));
    let config = ProviderConfig::from_file(file).map_err(|e| CliError::Config(e.to_string()))?;

    print_info("Validating configuration...");
    config.validate().map_err(CliError::Config)?;

    print_success("Configuration is valid!");

    println!("Configuration Summary:");
    println!("  Endpoint: {}", config.url);
    println!("  Block tracker: {:?}", config.block_tracker.kind);
    println!(
        "  Block cache: {}",
        if config.block_cache.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    Ok(())
}

fn show_config(file: &str) -> CliResult<()> {
    let config = ProviderConfig::from_file(file).map_err(|e| CliError::Config(e.to_string()))?;

    println!("Configuration from {file}:");
    println!("  Endpoint: {}", config.url);

    println!("\n[Transport]");
    println!("  Request Timeout: {}ms", config.transport.request_timeout_ms);
    println!("  Notification Buffer: {}", config.transport.notification_buffer);

    println!("\n[Block Tracker]");
    println!("  Kind: {:?}", config.block_tracker.kind);
    println!("  Poll Interval: {}ms", config.block_tracker.poll_interval_ms);

    println!("\n[Block Cache]");
    println!("  Enabled: {}", config.block_cache.enabled);
    println!("  Max Blocks: {}", config.block_cache.max_blocks);
    println!("  Max Perma Entries: {}", config.block_cache.max_perma_entries);

    println!("\n[Logging]");
    println!("  Level: {}", config.logging.level);
    println!("  Format: {}", config.logging.format);

    Ok(())
}
