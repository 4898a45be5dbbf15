//! Error handling for Hostshift
//!
//! Errors fall into two groups. Fatal errors (unreadable input lists, failed
//! authentication, missing control-plane tooling, invalid configuration) stop
//! the run before any VM is touched. Per-VM errors end the processing of a
//! single VM; the orchestrator records the failure and moves on.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Hostshift Error Taxonomy                  │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Fatal               │  Per-VM (final)      │  Per-VM (retry) │
//! │  • FileNotFound      │  • VmNotFound        │  • Initiation   │
//! │  • EmptyInput        │  • UnsupportedState  │  • Timeout      │
//! │  • Authentication    │  • NoTargetHost      │  • Platform     │
//! │  • DependencyMissing │  • ControlPlane      │                 │
//! │  • Configuration     │                      │                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod constructors;
pub mod types;


pub use types::{HostshiftError, HostshiftResult};
