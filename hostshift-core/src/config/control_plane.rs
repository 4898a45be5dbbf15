//! Compute control-plane connection configuration

use super::defaults::*;
use super::{parse_duration_secs_from, EnvLookup};
use crate::error::{HostshiftError, HostshiftResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How to reach the compute control plane
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Control-plane CLI executable
    pub command: String,

    /// Named cloud from clouds.yaml, passed as `--os-cloud`
    pub cloud: Option<String>,

    /// Maximum runtime of a single control-plane call
    #[serde(with = "humantime_serde")]
    pub command_timeout: Duration,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_CONTROL_PLANE_COMMAND.to_string(),
            cloud: None,
            command_timeout: duration_secs(DEFAULT_CONTROL_PLANE_TIMEOUT_SECS),
        }
    }
}

impl ControlPlaneConfig {
    pub(crate) fn apply_env(&mut self, lookup: EnvLookup<'_>) -> HostshiftResult<()> {
        if let Some(val) = lookup("HOSTSHIFT_CONTROL_PLANE_COMMAND") {
            self.command = val;
        }
        if let Some(val) = lookup("HOSTSHIFT_OS_CLOUD") {
            self.cloud = Some(val);
        }
        self.command_timeout = parse_duration_secs_from(
            lookup,
            "HOSTSHIFT_CONTROL_PLANE_TIMEOUT_SECS",
            self.command_timeout,
        )?;
        Ok(())
    }

    pub fn validate(&self) -> HostshiftResult<()> {
        if self.command.trim().is_empty() {
            return Err(HostshiftError::configuration(
                "control_plane.command",
                "must not be empty",
            ));
        }
        if self.command_timeout.is_zero() {
            return Err(HostshiftError::configuration(
                "control_plane.command_timeout",
                "must be positive",
            ));
        }
        Ok(())
    }
}
