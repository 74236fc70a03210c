//! Configuration module for the optional settings file.
//!
//! The monitor takes no command-line arguments; the few knobs it has live in
//! a JSON file that may be absent.

use crate::error::ConfigError;
use crate::registry::{DEFAULT_CAPACITY, DEFAULT_MAX_NAME_LEN};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "RANDR_TAIL_CONFIG";

/// Upper bound for the registry capacity.
const MAX_CAPACITY: usize = 1024;

/// Upper bound for the output name length limit.
const MAX_NAME_LEN_LIMIT: usize = 4096;

/// Monitor configuration.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Number of outputs tracked at once
    pub capacity: usize,
    /// Longest accepted output name in bytes
    pub max_name_len: usize,
    /// X display to connect to instead of `$DISPLAY`
    pub display: Option<String>,
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// Also write JSON logs to a rotating file
    pub log_file: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            display: None,
            log_level: "info".to_string(),
            log_file: false,
        }
    }
}

impl Config {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 || self.capacity > MAX_CAPACITY {
            return Err(ConfigError::ValidationError(format!(
                "capacity ({}) must be between 1 and {}",
                self.capacity, MAX_CAPACITY
            )));
        }

        if self.max_name_len == 0 || self.max_name_len > MAX_NAME_LEN_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "max_name_len ({}) must be between 1 and {}",
                self.max_name_len, MAX_NAME_LEN_LIMIT
            )));
        }

        if matches!(&self.display, Some(display) if display.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "display must not be empty when set".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from file, or defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source: e,
        })?;

        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Config file location: `$RANDR_TAIL_CONFIG`, else
    /// `~/.config/randr-tail/config.json`. `None` when neither resolves,
    /// in which case the defaults apply.
    pub fn default_path() -> Option<PathBuf> {
        resolve_path(std::env::var_os(CONFIG_PATH_ENV), dirs::config_dir())
    }
}

fn resolve_path(override_path: Option<OsString>, config_dir: Option<PathBuf>) -> Option<PathBuf> {
    override_path
        .map(PathBuf::from)
        .or_else(|| config_dir.map(|dir| dir.join("randr-tail").join("config.json")))
}
