//! Common patterns shared across Hostshift

pub mod retry;

pub use retry::{retry, RetryConfig, Retried};
