//! Configuration loaded from `config.toml` in the data directory
//!
//! ```toml
//! [scheduler]
//! initial_ease_factor = 2.5
//! minimum_ease_factor = 1.3
//! fail_penalty = 0.2
//! hard_penalty = 0.15
//! easy_bonus = 0.15
//! first_interval_days = 1
//! second_interval_days = 6
//!
//! [storage]
//! capacity_bytes = 5242880
//!
//! [session]
//! default_limit = 20
//! max_commit_attempts = 3
//! history_capacity = 50
//! ```
//!
//! Every key is optional; missing keys take the values shown above.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::progress::DEFAULT_CAPACITY_BYTES;
use crate::scheduling::{SchedulerParams, SchedulingError};

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Scheduler(#[from] SchedulingError),

    #[error("Invalid {0}")]
    Invalid(String),

    #[error("Data directory not found")]
    DataDirNotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Byte budget for stored progress records
    pub capacity_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Items per session when the caller gives no limit
    pub default_limit: usize,
    /// Attempts at committing one review when writes conflict
    pub max_commit_attempts: u32,
    /// Finished sessions kept in memory
    pub history_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_commit_attempts: 3,
            history_capacity: 50,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    pub scheduler: SchedulerParams,
    pub storage: StorageConfig,
    pub session: SessionConfig,
}

impl RecallConfig {
    /// Default data directory (e.g., ~/.local/share/recall)
    pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
        dirs::data_local_dir()
            .map(|p| p.join("recall"))
            .ok_or(ConfigError::DataDirNotFound)
    }

    /// Load `config.toml` from `data_dir`, falling back to defaults when the
    /// file does not exist
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse { path: path.clone(), source },
            other => other,
        })?;
        log::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RecallConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from(CONFIG_FILE_NAME),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate()?;
        if self.session.max_commit_attempts == 0 {
            return Err(ConfigError::Invalid(
                "session.max_commit_attempts: must be at least 1".to_string(),
            ));
        }
        if self.storage.capacity_bytes == 0 {
            return Err(ConfigError::Invalid(
                "storage.capacity_bytes: must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
