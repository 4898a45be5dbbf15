//! OpenStack compute control plane for Hostshift
//!
//! Talks to Nova through the `openstack` command-line client with JSON
//! output. Commands run through the core [`CommandExecutor`] so tests can
//! script every response.
//!
//! [`CommandExecutor`]: hostshift_core::abstractions::CommandExecutor

pub mod cli_backend;
pub mod output;

pub use cli_backend::OpenStackCli;

// Re-export core types for convenience
pub use hostshift_core::{
    control_plane::ControlPlane,
    error::{HostshiftError, HostshiftResult},
    types::{HostService, HostSummary, VmSnapshot, VmStatus},
};
