//! Configuration management command
//!
//! View and edit `config.toml` from the command line.

use crate::system_config::{self, SystemConfig};
use anyhow::{Context, Result};
use formkeep_core::NullPolicy;
use owo_colors::OwoColorize;
use std::path::PathBuf;

const KEYS: &[&str] = &[
    "autosave.enabled",
    "autosave.delay_ms",
    "equality.null_policy",
    "store.path",
    "store.retain_count",
];

/// List all configuration values
pub async fn run_list() -> Result<()> {
    let config = system_config::load()?;
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;

    println!("{}", "Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    println!("{}", "[autosave]".yellow());
    println!("  {} = {}", "enabled".cyan(), config.autosave.enabled);
    println!(
        "  {} = {} {}",
        "delay_ms".cyan(),
        config.autosave.delay_ms,
        format!("({:.1}s)", config.autosave.delay_ms as f64 / 1000.0).dimmed()
    );

    println!("\n{}", "[equality]".yellow());
    println!("  {} = {}", "null_policy".cyan(), config.equality.null_policy);

    println!("\n{}", "[store]".yellow());
    match &config.store.path {
        Some(path) => println!("  {} = {}", "path".cyan(), path.display()),
        None => println!(
            "  {} = {} {}",
            "path".cyan(),
            config.store_dir()?.display(),
            "(default)".dimmed()
        ),
    }
    println!("  {} = {}", "retain_count".cyan(), config.store.retain_count);

    println!("\n{}", "Valid Ranges:".bold());
    println!("  delay_ms: 100-600,000");
    println!("  null_policy: distinct | missing-equals-null");
    println!("  retain_count: 1-100,000");

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let config = system_config::load()?;
    println!("{}", get_value(&config, key)?);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = system_config::load()?;
    set_value(&mut config, key, value)?;

    config.validate()
        .context("Invalid configuration value")?;

    system_config::save(&config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;

    if create && !config_path.exists() {
        system_config::init_if_missing()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else {
        println!("{}", config_path.display());
        if !config_path.exists() {
            println!("{}", "File does not exist. Use --create to create it.".yellow());
        }
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", system_config::example_config());
    Ok(())
}

fn get_value(config: &SystemConfig, key: &str) -> Result<String> {
    let value = match key {
        "autosave.enabled" => config.autosave.enabled.to_string(),
        "autosave.delay_ms" => config.autosave.delay_ms.to_string(),
        "equality.null_policy" => config.equality.null_policy.to_string(),
        "store.path" => config.store_dir()?.display().to_string(),
        "store.retain_count" => config.store.retain_count.to_string(),
        _ => return Err(unknown_key(key)),
    };
    Ok(value)
}

fn set_value(config: &mut SystemConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "autosave.enabled" => {
            config.autosave.enabled = value.parse()
                .context("Invalid value: must be 'true' or 'false'")?;
        }
        "autosave.delay_ms" => {
            config.autosave.delay_ms = value.parse()
                .context("Invalid value: must be a positive integer")?;
        }
        "equality.null_policy" => {
            config.equality.null_policy = value
                .parse::<NullPolicy>()
                .map_err(anyhow::Error::msg)?;
        }
        "store.path" => {
            config.store.path = if value.is_empty() { None } else { Some(PathBuf::from(value)) };
        }
        "store.retain_count" => {
            config.store.retain_count = value.parse()
                .context("Invalid value: must be a positive integer")?;
        }
        _ => return Err(unknown_key(key)),
    }
    Ok(())
}

fn unknown_key(key: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Unknown config key: {}. Available keys: {}",
        key,
        KEYS.join(", ")
    )
}
