//! Application configuration loaded from `mill-jit.toml`.
//!
//! Every section is optional. Values from the file are overlaid by
//! environment variables, so a deployment can run with no file at all.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::db::RepositoryConfig;
use crate::services::{ForecastConfig, SchedulerSettings};

pub const CONFIG_FILE_NAME: &str = "mill-jit.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// `[repository]` and `[postgres]`
    #[serde(flatten)]
    pub storage: RepositoryConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

fn parse_env<T: FromStr>(key: &str, target: &mut T) {
    if let Some(value) = std::env::var(key).ok().and_then(|v| v.parse().ok()) {
        *target = value;
    }
}

impl AppConfig {
    pub fn from_toml_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents, path)
    }

    /// First `mill-jit.toml` found in `.`, `backend/` or `..`.
    pub fn find_config_file() -> Option<PathBuf> {
        [".", "backend", ".."]
            .iter()
            .map(|dir| Path::new(dir).join(CONFIG_FILE_NAME))
            .find(|p| p.is_file())
    }

    /// Load the config file if one is found, otherwise defaults, then apply
    /// environment overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Self::from_file(path)?
            }
            None => {
                log::info!("No {} found, using defaults", CONFIG_FILE_NAME);
                Self::default()
            }
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.storage.apply_env();
        parse_env("HOST", &mut self.server.host);
        parse_env("PORT", &mut self.server.port);
        parse_env("FORECAST_INTERVAL_SECS", &mut self.scheduler.interval_secs);
        parse_env("FORECAST_HORIZON_HOURS", &mut self.forecast.default_horizon);
        parse_env("MILL_UTC_OFFSET_MINUTES", &mut self.forecast.utc_offset_minutes);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.storage
            .repository_type()
            .map_err(|e| ConfigError::Invalid(format!("[repository] {}", e)))?;
        self.forecast.validate()?;
        if self.scheduler.interval_secs == 0 || self.scheduler.run_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "[scheduler] interval_secs and run_timeout_secs must be positive".to_string(),
            ));
        }
        if self.scheduler.retention_days <= 0 {
            return Err(ConfigError::Invalid(
                "[scheduler] retention_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_all_defaults() {
        let config = AppConfig::from_toml_str("", Path::new("inline")).unwrap();
        assert_eq!(config.forecast, ForecastConfig::default());
        assert_eq!(config.scheduler, SchedulerSettings::default());
        assert_eq!(config.server.port, 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sections_parse() {
        let toml = r#"
[repository]
type = "local"

[forecast]
default_horizon = 6
utc_offset_minutes = -180

[forecast.confidence]
values = [0.9, 0.8]
floor = 0.5

[forecast.thresholds]
high_inflow = 70.0

[scheduler]
interval_secs = 60
"#;
        let config = AppConfig::from_toml_str(toml, Path::new("inline")).unwrap();
        assert_eq!(config.forecast.default_horizon, 6);
        assert_eq!(config.forecast.utc_offset_minutes, -180);
        assert_eq!(config.forecast.confidence.confidence(3), 0.5);
        assert_eq!(config.forecast.thresholds.high_inflow, 70.0);
        assert_eq!(config.forecast.thresholds.low_outflow, 80.0);
        assert_eq!(config.scheduler.interval_secs, 60);
        assert_eq!(config.scheduler.retention_days, 7);
    }

    #[test]
    fn test_increasing_schedule_is_a_parse_error() {
        let toml = "[forecast.confidence]\nvalues = [0.5, 0.9]\nfloor = 0.4\n";
        let err = AppConfig::from_toml_str(toml, Path::new("inline")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
