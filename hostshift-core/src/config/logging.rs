//! Run log configuration

use super::defaults::*;
use super::EnvLookup;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where and how verbosely run logs are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory receiving the run log and the error log
    pub directory: PathBuf,

    /// Default filter directive when no environment override is set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_LOG_DIR),
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl LoggingConfig {
    pub(crate) fn apply_env(&mut self, lookup: EnvLookup<'_>) {
        if let Some(val) = lookup("HOSTSHIFT_LOG_DIR") {
            self.directory = PathBuf::from(val);
        }
    }
}
