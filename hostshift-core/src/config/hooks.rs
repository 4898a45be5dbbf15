//! Migration hook configuration

use super::defaults::*;
use super::EnvLookup;
use crate::error::{HostshiftError, HostshiftResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Optional executables invoked around each VM migration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    /// Run before a VM's first migration attempt, with `<vm> <target>`
    pub pre_migration: Option<PathBuf>,

    /// Run after a successful migration, with `<vm> <target>`
    pub post_migration: Option<PathBuf>,

    /// Run after a VM ends in failure, with `<vm> <error>`
    pub on_failure: Option<PathBuf>,

    /// Maximum runtime of a single hook
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            pre_migration: None,
            post_migration: None,
            on_failure: None,
            timeout: duration_secs(DEFAULT_HOOK_TIMEOUT_SECS),
        }
    }
}

impl HooksConfig {
    pub fn is_empty(&self) -> bool {
        self.pre_migration.is_none() && self.post_migration.is_none() && self.on_failure.is_none()
    }

    pub(crate) fn apply_env(&mut self, lookup: EnvLookup<'_>) {
        if let Some(val) = lookup("HOSTSHIFT_PRE_MIGRATION_HOOK") {
            self.pre_migration = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup("HOSTSHIFT_POST_MIGRATION_HOOK") {
            self.post_migration = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup("HOSTSHIFT_FAILURE_HOOK") {
            self.on_failure = Some(PathBuf::from(val));
        }
    }

    pub fn validate(&self) -> HostshiftResult<()> {
        if !self.is_empty() && self.timeout.is_zero() {
            return Err(HostshiftError::configuration(
                "hooks.timeout",
                "must be positive when hooks are configured",
            ));
        }
        Ok(())
    }
}
