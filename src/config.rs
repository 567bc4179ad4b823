//! Runtime settings, read from the environment with defaults for anything unset.

use log::LevelFilter;
use std::{env, path::PathBuf, str::FromStr};
use thiserror::Error;

pub const TABLES_DIR_VAR: &str = "REPAYMENT_TABLES_DIR";
pub const LOG_LEVEL_VAR: &str = "REPAYMENT_LOG_LEVEL";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: off, error, warn, info, debug, trace")]
    InvalidLogLevel(String),
}

#[derive(Clone, PartialEq, Debug)]
pub struct Config {
    /// Where CSV amortization tables are written
    pub tables_dir: PathBuf,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tables_dir: PathBuf::from("files/tables"),
            log_level: LevelFilter::Info,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(dir) = lookup(TABLES_DIR_VAR).filter(|dir| !dir.is_empty()) {
            config.tables_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup(LOG_LEVEL_VAR) {
            config.log_level =
                LevelFilter::from_str(level.trim()).map_err(|_| ConfigError::InvalidLogLevel(level))?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigError, LOG_LEVEL_VAR, TABLES_DIR_VAR};
    use log::LevelFilter;
    use std::path::PathBuf;
    use test_log::test;

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.tables_dir, PathBuf::from("files/tables"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(|var| match var {
            TABLES_DIR_VAR => Some("/tmp/loans".to_string()),
            LOG_LEVEL_VAR => Some("Debug".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.tables_dir, PathBuf::from("/tmp/loans"));
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn test_bad_level() {
        let result = Config::from_lookup(|var| (var == LOG_LEVEL_VAR).then(|| "loud".to_string()));
        assert_eq!(result, Err(ConfigError::InvalidLogLevel("loud".to_string())));
    }
}
