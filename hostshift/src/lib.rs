//! Command-line front ends for Hostshift
//!
//! `hostshift` runs a migration; `hostshift-status` prints read-only VM and
//! host reports. Both share the wiring in [`setup`] and the tracing setup in
//! [`logging`].

pub mod logging;
pub mod setup;

pub use logging::RunLog;

// Re-export commonly used types
pub use hostshift_core::{
    error::{HostshiftError, HostshiftResult},
    HostshiftConfig, RunOrchestrator, RunSummary,
};
pub use hostshift_openstack::OpenStackCli;
