//! Configuration resolution for Sidebet.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/sidebet/settings.json)
//! 3. Project config (.sidebet/settings.json)
//! 4. Environment variables
//! 5. CLI arguments (highest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete Sidebet configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub bets: BetConfig,
}

/// Storage-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub database_path: Option<PathBuf>,
    pub log_level: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: "info".to_string(),
        }
    }
}

/// Bet rule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetConfig {
    /// Default stake suggested by the create-bet wizard (dollars).
    pub default_stake: f64,
}

impl Default for BetConfig {
    fn default() -> Self {
        Self { default_stake: 10.0 }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    // Load global config
    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    // Load project config
    if let Some(dir) = project_dir {
        let project_path = dir.join(".sidebet").join("settings.json");
        if project_path.exists() {
            let project = load_config_file(&project_path)?;
            merge_config(&mut config, project);
        }
    }

    // Apply environment overrides
    apply_env_overrides(&mut config);

    Ok(config)
}

/// Get the global config file path (platform config directory).
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sidebet").join("settings.json"))
}

/// Get the default ledger database path (platform data directory).
pub fn database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("sidebet").join("ledger.db"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Validation(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Validation(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    if overlay.store.database_path.is_some() {
        base.store.database_path = overlay.store.database_path;
    }
    base.store.log_level = overlay.store.log_level;
    base.bets = overlay.bets;
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(val) = std::env::var("SIDEBET_DATABASE_PATH") {
        config.store.database_path = Some(PathBuf::from(val));
    }
    if let Ok(val) = std::env::var("SIDEBET_LOG_LEVEL") {
        config.store.log_level = val;
    }
    if let Ok(val) = std::env::var("SIDEBET_DEFAULT_STAKE") {
        if let Ok(n) = val.parse() {
            config.bets.default_stake = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stake_is_ten_dollars() {
        let config = Config::default();
        assert!((config.bets.default_stake - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn project_config_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings_dir = dir.path().join(".sidebet");
        std::fs::create_dir_all(&settings_dir).unwrap();
        std::fs::write(
            settings_dir.join("settings.json"),
            r#"{"bets": {"default_stake": 25.0}}"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path())).unwrap();
        assert!((config.bets.default_stake - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn platform_paths_land_under_sidebet() {
        if let Some(path) = global_config_path() {
            assert!(path.ends_with("sidebet/settings.json"));
        }
        if let Some(path) = database_path() {
            assert!(path.ends_with("sidebet/ledger.db"));
        }
    }
}
