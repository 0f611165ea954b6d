//! User-level configuration (`config.toml`)
//!
//! Location: `$FORMKEEP_CONFIG` if set, otherwise
//! `<config dir>/formkeep/config.toml`. A missing file means defaults.

use anyhow::{Context, Result};
use formkeep_core::NullPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "FORMKEEP_CONFIG";

/// Full configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub autosave: AutosaveConfig,

    #[serde(default)]
    pub equality: EqualityConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// `[autosave]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutosaveConfig {
    /// Save automatically after a quiet period (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Quiet period in milliseconds (default: 30000)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

/// `[equality]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EqualityConfig {
    /// "distinct" or "missing-equals-null" (default: distinct)
    #[serde(default)]
    pub null_policy: NullPolicy,
}

/// `[store]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store directory (default: `<data dir>/formkeep`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Revisions kept per session (default: 50)
    #[serde(default = "default_retain_count")]
    pub retain_count: usize,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: default_delay_ms(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            retain_count: default_retain_count(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_delay_ms() -> u64 {
    30_000
}

/// Bounds of `autosave.delay_ms`, also enforced on `fk edit --delay-ms`
pub const MIN_DELAY_MS: u64 = 100;
pub const MAX_DELAY_MS: u64 = 600_000;

fn default_retain_count() -> usize {
    50
}

/// Out-of-range configuration value
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("autosave.delay_ms must be between 100 and 600000 (got {0})")]
    DelayOutOfRange(u64),

    #[error("store.retain_count must be between 1 and 100000 (got {0})")]
    RetainCountOutOfRange(usize),
}

impl SystemConfig {
    /// Check every value against its valid range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_DELAY_MS..=MAX_DELAY_MS).contains(&self.autosave.delay_ms) {
            return Err(ConfigError::DelayOutOfRange(self.autosave.delay_ms));
        }
        if !(1..=100_000).contains(&self.store.retain_count) {
            return Err(ConfigError::RetainCountOutOfRange(self.store.retain_count));
        }
        Ok(())
    }

    /// Directory holding the snapshot database
    pub fn store_dir(&self) -> Result<PathBuf> {
        if let Some(path) = &self.store.path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().context("Could not determine data directory")?;
        Ok(data_dir.join("formkeep"))
    }
}

/// Path of the config file
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("formkeep").join("config.toml"))
}

/// Load configuration, falling back to defaults when no file exists
pub fn load() -> Result<SystemConfig> {
    match config_file_path() {
        Some(path) if path.exists() => load_from(&path),
        _ => Ok(SystemConfig::default()),
    }
}

/// Load and validate a specific config file
pub fn load_from(path: &Path) -> Result<SystemConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: SystemConfig = toml::from_str(&text)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}

/// Write configuration to the config file
pub fn save(config: &SystemConfig) -> Result<()> {
    let path = config_file_path().context("Could not determine config file path")?;
    save_to(config, &path)
}

/// Write configuration to a specific path
pub fn save_to(config: &SystemConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }
    let text = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write config file {}", path.display()))?;
    Ok(())
}

/// Create the config file with defaults if it does not exist yet
pub fn init_if_missing() -> Result<PathBuf> {
    let path = config_file_path().context("Could not determine config file path")?;
    if !path.exists() {
        save_to(&SystemConfig::default(), &path)?;
    }
    Ok(path)
}

/// Annotated example configuration
pub fn example_config() -> &'static str {
    r#"# formkeep configuration

[autosave]
# Save automatically after the form has been quiet for delay_ms
enabled = true
delay_ms = 30000        # 100..=600000

[equality]
# "distinct": {} and {"field": null} differ
# "missing-equals-null": a missing field equals an explicit null
null_policy = "distinct"

[store]
# path = "/var/lib/formkeep"
retain_count = 50       # revisions kept per session, 1..=100000
"#
}
