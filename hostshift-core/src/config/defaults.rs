//! Default configuration values for Hostshift
//!
//! This module centralizes all default values to make them easy to find and modify.

use std::time::Duration;

// Migration defaults
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MIGRATION_TIMEOUT_SECS: u64 = 600; // 10 minutes
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_RETRY_BACKOFF_SECS: u64 = 30;
pub const DEFAULT_INTER_VM_DELAY_SECS: u64 = 5;

// Balancing defaults
pub const DEFAULT_BALANCE_STRATEGY: &str = "vm_count";

// Hook defaults
pub const DEFAULT_HOOK_TIMEOUT_SECS: u64 = 60;

// Control plane defaults
pub const DEFAULT_CONTROL_PLANE_COMMAND: &str = "openstack";
pub const DEFAULT_CONTROL_PLANE_TIMEOUT_SECS: u64 = 120;

// Logging defaults
pub const DEFAULT_LOG_DIR: &str = "./logs";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Helper to create Duration from seconds
pub fn duration_secs(secs: u64) -> Duration {
    Duration::from_secs(secs)
}
