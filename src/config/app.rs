//! Application configuration loading from config.toml
//!
//! The file is optional: every field has a default, so a fresh checkout runs
//! against a local `SQLite` file with the daily jobs scheduled shortly after midnight UTC.

use crate::errors::{Error, Result};
use chrono::NaiveTime;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Ledger store settings
    pub database: DatabaseConfig,
    /// Daily job settings
    pub scheduler: SchedulerConfig,
}

/// Ledger store settings
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL; `DATABASE_URL` takes precedence when set
    pub url: Option<String>,
}

/// Daily job settings. Times are UTC wall-clock times.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Whether the binary runs the daily jobs at all
    pub enabled: bool,
    /// When the overdue sweeps run
    pub overdue_at: NaiveTime,
    /// When auto-pay and auto-receipt run
    pub settlement_at: NaiveTime,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            overdue_at: NaiveTime::MIN,
            settlement_at: NaiveTime::from_hms_opt(1, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl AppConfig {
    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.settlement_at < self.scheduler.overdue_at {
            return Err(Error::Config {
                message: format!(
                    "settlement_at ({}) must not precede overdue_at ({})",
                    self.scheduler.settlement_at, self.scheduler.overdue_at
                ),
            });
        }
        Ok(())
    }
}

/// Parses and validates configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from a TOML file. A missing file yields the defaults.
///
/// # Errors
/// Returns an error if:
/// - The file exists but cannot be read
/// - The TOML syntax is invalid
/// - The scheduler times are inconsistent
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        info!("No configuration file at {:?}, using defaults", path);
        return Ok(AppConfig::default());
    }

    debug!("Loading configuration from {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path:?}: {e}"),
    })?;
    parse_config(&contents)
}

/// Loads configuration from `CONFIG_PATH`, or `./config.toml` when unset.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_config(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [database]
            url = "sqlite::memory:"

            [scheduler]
            enabled = false
            overdue_at = "00:30:00"
            settlement_at = "02:15:00"
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.database.url.as_deref(), Some("sqlite::memory:"));
        assert!(!config.scheduler.enabled);
        assert_eq!(
            config.scheduler.overdue_at,
            NaiveTime::from_hms_opt(0, 30, 0).unwrap()
        );
        assert_eq!(
            config.scheduler.settlement_at,
            NaiveTime::from_hms_opt(2, 15, 0).unwrap()
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert!(config.database.url.is_none());
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.overdue_at, NaiveTime::MIN);
        assert_eq!(
            config.scheduler.settlement_at,
            NaiveTime::from_hms_opt(1, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_settlement_before_overdue_is_rejected() {
        let toml_str = r#"
            [scheduler]
            overdue_at = "03:00:00"
            settlement_at = "01:00:00"
        "#;

        let result = parse_config(toml_str);
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config("does/not/exist/config.toml").unwrap();
        assert!(config.scheduler.enabled);
    }
}
