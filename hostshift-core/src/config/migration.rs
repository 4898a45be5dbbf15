//! Migration execution configuration

use super::defaults::*;
use super::{parse_bool_from, parse_duration_secs_from, parse_from, EnvLookup};
use crate::error::{HostshiftError, HostshiftResult};
use crate::types::MigrationKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Migration execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Total number of attempts per VM (first attempt included)
    pub max_retries: u32,

    /// How long to poll a single attempt before giving up on it
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Interval between status polls
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Fixed wait before re-attempting a failed migration
    #[serde(with = "humantime_serde")]
    pub retry_backoff: Duration,

    /// Throttle between consecutive VMs
    #[serde(with = "humantime_serde")]
    pub inter_vm_delay: Duration,

    /// Allow live migration of running VMs
    pub live_migration: bool,

    /// Allow cold migration of powered-off VMs
    pub cold_migration: bool,

    /// Re-read the VM status before each retry instead of reusing the
    /// status captured at inspection time
    pub reinspect_before_retry: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: duration_secs(DEFAULT_MIGRATION_TIMEOUT_SECS),
            poll_interval: duration_secs(DEFAULT_POLL_INTERVAL_SECS),
            retry_backoff: duration_secs(DEFAULT_RETRY_BACKOFF_SECS),
            inter_vm_delay: duration_secs(DEFAULT_INTER_VM_DELAY_SECS),
            live_migration: true,
            cold_migration: true,
            reinspect_before_retry: false,
        }
    }
}

impl MigrationConfig {
    /// Whether the given migration kind is enabled
    pub fn allows(&self, kind: MigrationKind) -> bool {
        match kind {
            MigrationKind::Live => self.live_migration,
            MigrationKind::Cold => self.cold_migration,
        }
    }

    pub(crate) fn apply_env(&mut self, lookup: EnvLookup<'_>) -> HostshiftResult<()> {
        if let Some(val) = lookup("HOSTSHIFT_MAX_RETRIES") {
            self.max_retries = parse_from("HOSTSHIFT_MAX_RETRIES", &val)?;
        }
        self.timeout = parse_duration_secs_from(lookup, "HOSTSHIFT_TIMEOUT_SECS", self.timeout)?;
        self.poll_interval =
            parse_duration_secs_from(lookup, "HOSTSHIFT_POLL_INTERVAL_SECS", self.poll_interval)?;
        self.retry_backoff =
            parse_duration_secs_from(lookup, "HOSTSHIFT_RETRY_BACKOFF_SECS", self.retry_backoff)?;
        self.inter_vm_delay =
            parse_duration_secs_from(lookup, "HOSTSHIFT_INTER_VM_DELAY_SECS", self.inter_vm_delay)?;
        self.live_migration =
            parse_bool_from(lookup, "HOSTSHIFT_LIVE_MIGRATION", self.live_migration)?;
        self.cold_migration =
            parse_bool_from(lookup, "HOSTSHIFT_COLD_MIGRATION", self.cold_migration)?;
        Ok(())
    }

    /// Validate the migration settings
    pub fn validate(&self) -> HostshiftResult<()> {
        if self.max_retries == 0 {
            return Err(HostshiftError::invalid_config(
                "migration.max_retries",
                self.max_retries,
                "at least one attempt is required",
            ));
        }
        if self.timeout.is_zero() {
            return Err(HostshiftError::invalid_config(
                "migration.timeout",
                format!("{:?}", self.timeout),
                "must be positive",
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(HostshiftError::invalid_config(
                "migration.poll_interval",
                format!("{:?}", self.poll_interval),
                "must be positive",
            ));
        }
        if !self.live_migration && !self.cold_migration {
            return Err(HostshiftError::configuration(
                "migration",
                "live and cold migration are both disabled",
            ));
        }
        Ok(())
    }
}
