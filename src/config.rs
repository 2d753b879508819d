//! Runtime configuration.
//!
//! Defaults, overlaid by an optional JSON file (`TRENDSENSE_CONFIG`), overlaid
//! by environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_CONFIG_FILE: &str = "TRENDSENSE_CONFIG";
pub const ENV_DATA_DIR: &str = "TRENDSENSE_DATA_DIR";
pub const ENV_READ_TIMEOUT_MS: &str = "TRENDSENSE_READ_TIMEOUT_MS";
pub const ENV_PORT: &str = "PORT";

/// Loader and view settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the generated CSV files (default: "generated_data")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Per-file read timeout in milliseconds (default: 5000)
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Listen port handed through to the web process (default: 8050)
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub views: ViewConfig,
}

/// Sizes of the derived dashboard views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Bars in the top-keywords chart (default: 10)
    #[serde(default = "default_top_keywords")]
    pub top_keywords: usize,

    /// Keywords that get a trend line (default: 5)
    #[serde(default = "default_trend_keywords")]
    pub trend_keywords: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("generated_data")
}

fn default_read_timeout_ms() -> u64 {
    5000
}

fn default_port() -> u16 {
    8050
}

fn default_top_keywords() -> usize {
    10
}

fn default_trend_keywords() -> usize {
    5
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            top_keywords: default_top_keywords(),
            trend_keywords: default_trend_keywords(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            read_timeout_ms: default_read_timeout_ms(),
            port: default_port(),
            views: ViewConfig::default(),
        }
    }
}

impl Config {
    /// Config reading files from `data_dir`, everything else default.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Defaults, then `TRENDSENSE_CONFIG`, then the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(ENV_CONFIG_FILE) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay values found through `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(ms) = lookup(ENV_READ_TIMEOUT_MS) {
            self.read_timeout_ms = parse_env(ENV_READ_TIMEOUT_MS, &ms)?;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = parse_env(ENV_PORT, &port)?;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data_dir, PathBuf::from("generated_data"));
        assert_eq!(config.read_timeout(), Duration::from_secs(5));
        assert_eq!(config.port, 8050);
        assert_eq!(config.views.top_keywords, 10);
        assert_eq!(config.views.trend_keywords, 5);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{"port": 9000, "views": {"trend_keywords": 3}}"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.views.trend_keywords, 3);
        assert_eq!(config.views.top_keywords, 10);
        assert_eq!(config.data_dir, PathBuf::from("generated_data"));
    }

    #[test]
    fn test_env_overlay() {
        let env: HashMap<&str, &str> = [(ENV_DATA_DIR, "/srv/data"), (ENV_PORT, "8080")].into_iter().collect();
        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/data"));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_bad_env_value_is_an_error() {
        let mut config = Config::default();
        let err = config
            .apply_env(|k| (k == ENV_READ_TIMEOUT_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"data_dir": "exports", "read_timeout_ms": 250}"#).unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("exports"));
        assert_eq!(config.read_timeout(), Duration::from_millis(250));
    }
}
