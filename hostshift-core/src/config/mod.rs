//! Configuration for Hostshift
//!
//! Settings are layered: built-in defaults, then an optional TOML file,
//! then `HOSTSHIFT_*` environment variables. Command-line flags are applied
//! on top by the binaries before [`HostshiftConfig::validate`] runs.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{HostshiftError, HostshiftResult};

pub mod balancing;
pub mod control_plane;
pub mod defaults;
pub mod hooks;
pub mod logging;
pub mod migration;

pub use balancing::BalancingConfig;
pub use control_plane::ControlPlaneConfig;
pub use defaults::*;
pub use hooks::HooksConfig;
pub use logging::LoggingConfig;
pub use migration::MigrationConfig;

/// Lookup function used to read overrides (normally `std::env::var`)
pub(crate) type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Root configuration structure for Hostshift
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostshiftConfig {
    /// Retry, timeout and throttle settings
    pub migration: MigrationConfig,

    /// Target host selection
    pub balancing: BalancingConfig,

    /// Pre/post/failure hook commands
    pub hooks: HooksConfig,

    /// Control-plane CLI settings
    pub control_plane: ControlPlaneConfig,

    /// Run log settings
    pub logging: LoggingConfig,
}

impl HostshiftConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> HostshiftResult<Self> {
        toml::from_str(content)
            .map_err(|e| HostshiftError::configuration("config file", e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> HostshiftResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HostshiftError::configuration(
                "config file",
                format!("cannot read {}: {}", path.display(), e),
            )
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults or the given file, with environment overrides applied
    pub fn load(path: Option<&Path>) -> HostshiftResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `HOSTSHIFT_*` environment variable overrides
    pub fn apply_env(&mut self) -> HostshiftResult<()> {
        self.apply_env_from(&|key: &str| std::env::var(key).ok())
    }

    /// Apply overrides read through an arbitrary lookup function
    pub fn apply_env_from(
        &mut self,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> HostshiftResult<()> {
        self.migration.apply_env(lookup)?;
        self.balancing.apply_env(lookup);
        self.hooks.apply_env(lookup);
        self.control_plane.apply_env(lookup)?;
        self.logging.apply_env(lookup);
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> HostshiftResult<()> {
        self.migration.validate()?;
        self.balancing.validate()?;
        self.hooks.validate()?;
        self.control_plane.validate()?;
        Ok(())
    }
}

pub(crate) fn parse_from<T: FromStr>(key: &str, value: &str) -> HostshiftResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| HostshiftError::invalid_config(key, value, "cannot be parsed"))
}

pub(crate) fn parse_duration_secs_from(
    lookup: EnvLookup<'_>,
    key: &str,
    default: Duration,
) -> HostshiftResult<Duration> {
    match lookup(key) {
        Some(val) => parse_from::<u64>(key, &val).map(Duration::from_secs),
        None => Ok(default),
    }
}

pub(crate) fn parse_bool_from(
    lookup: EnvLookup<'_>,
    key: &str,
    default: bool,
) -> HostshiftResult<bool> {
    match lookup(key) {
        Some(val) => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(HostshiftError::invalid_config(key, val, "expected a boolean")),
        },
        None => Ok(default),
    }
}
