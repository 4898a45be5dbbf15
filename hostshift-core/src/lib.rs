//! Core library for Hostshift
//!
//! Sequentially relocates VMs onto the least-loaded of a fixed set of
//! compute hosts. The crate holds everything except the concrete
//! control-plane client and the command-line front ends:
//!
//! - [`input`] loads VM and host list files
//! - [`placement`] picks a target host for a VM
//! - [`executor`] runs one VM through inspect, migrate, poll and retry
//! - [`orchestrator`] walks the VM list and produces a [`RunSummary`]
//! - [`report`] builds read-only status and planning views

pub mod abstractions;
pub mod config;
pub mod control_plane;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod input;
pub mod orchestrator;
pub mod patterns;
pub mod placement;
pub mod report;
pub mod types;

pub use config::HostshiftConfig;
pub use control_plane::ControlPlane;
pub use error::{HostshiftError, HostshiftResult};
pub use executor::{MigrationExecutor, VmOutcome};
pub use orchestrator::{RunOrchestrator, RunSummary};
pub use placement::{PlacementDecision, PlacementStrategy};
pub use types::{MigrationKind, VmSnapshot, VmStatus};
