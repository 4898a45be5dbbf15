//! Core error types for Hostshift
//!
//! This module contains the main HostshiftError enum with all error variants
//! and the associated Result aliases.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::{MigrationKind, VmStatus};

/// Error type for every Hostshift operation
///
/// # Error Categories
///
/// - **Fatal Errors**: abort the run before any migration is issued
///   (input files, credentials, missing tooling, configuration)
/// - **Per-VM Errors**: end one VM's processing as a failure; the run
///   continues with the next VM
/// - **Retryable Errors**: the per-VM subset that re-enters the migration
///   step after a backoff (initiation, timeout, platform error)
#[derive(Error, Debug)]
pub enum HostshiftError {
    // Input Errors
    #[error("Input file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Input file {} contains no entries", path.display())]
    EmptyInput { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Precondition Errors
    #[error("Authentication with the control plane failed: {message}")]
    Authentication { message: String },

    #[error("Required tool '{tool}' is not available: {details}")]
    DependencyMissing { tool: String, details: String },

    #[error("Configuration error in {component}: {message}")]
    ConfigurationError { component: String, message: String },

    // Per-VM Errors
    #[error("VM '{vm}' not found")]
    VmNotFound { vm: String },

    #[error("VM '{vm}' is in unsupported state {status} for migration")]
    UnsupportedState { vm: String, status: VmStatus },

    #[error("No target host available for VM '{vm}'")]
    NoTargetHost { vm: String },

    #[error("Failed to initiate {kind} migration of VM '{vm}' to {target}: {details}")]
    MigrationInitiation {
        vm: String,
        target: String,
        kind: MigrationKind,
        details: String,
    },

    #[error("{kind} migration of VM '{vm}' to {target} timed out after {timeout:?}")]
    MigrationTimeout {
        vm: String,
        target: String,
        kind: MigrationKind,
        timeout: Duration,
    },

    #[error("{kind} migration of VM '{vm}' failed on the platform: {details}")]
    MigrationPlatform {
        vm: String,
        kind: MigrationKind,
        details: String,
    },

    // Control Plane Errors
    #[error("Control plane operation '{operation}' failed: {details}")]
    ControlPlane { operation: String, details: String },

    #[error("Failed to parse control plane output for '{operation}'")]
    ControlPlaneOutput {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    // Command Execution
    #[error("Command '{program}' failed: {details}")]
    CommandFailed { program: String, details: String },

    #[error("Command '{program}' timed out after {duration:?}")]
    CommandTimeout { program: String, duration: Duration },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type HostshiftResult<T> = std::result::Result<T, HostshiftError>;
