//! Trait abstractions over the outside world
//!
//! Components depend on these interfaces rather than on the system clock or
//! on process spawning directly, which keeps the migration state machine
//! testable without real delays or real control-plane tooling.

pub mod command;
pub mod time;

pub use command::*;
pub use time::*;
