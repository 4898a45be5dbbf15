//! Retry and backoff for migration attempts
//!
//! Delays go through a [`Clock`] so simulated runs never actually wait.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::abstractions::Clock;
use crate::error::{HostshiftError, HostshiftResult};

/// Configuration for a retried operation
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial attempt)
    pub max_attempts: u32,
    /// Fixed delay between a failed attempt and the next one
    pub backoff: Duration,
    /// Decides whether a failed attempt is worth repeating
    pub is_retryable: fn(&HostshiftError) -> bool,
    /// Name used in log lines
    pub operation_name: String,
}

/// Final result of a retried operation with the number of attempts spent
#[derive(Debug)]
pub struct Retried<T> {
    pub result: HostshiftResult<T>,
    pub attempts: u32,
}

/// Run `operation` until it succeeds, fails permanently, or attempts run out
///
/// The operation receives the 1-based attempt number. No delay follows the
/// last attempt.
pub async fn retry<F, Fut, T>(clock: &dyn Clock, config: &RetryConfig, mut operation: F) -> Retried<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = HostshiftResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        "{} succeeded after {} attempts",
                        config.operation_name, attempt
                    );
                }
                return Retried {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(error) => {
                if !(config.is_retryable)(&error) {
                    debug!("{}: error is not retryable: {}", config.operation_name, error);
                    return Retried {
                        result: Err(error),
                        attempts: attempt,
                    };
                }

                if attempt >= max_attempts {
                    warn!(
                        "{}: max attempts ({}) reached",
                        config.operation_name, max_attempts
                    );
                    return Retried {
                        result: Err(error),
                        attempts: attempt,
                    };
                }

                let delay = config.backoff;
                warn!(
                    "Retry attempt {}/{} for {} after error: {} (waiting {:?})",
                    attempt, max_attempts, config.operation_name, error, delay
                );
                clock.sleep(delay).await;
            }
        }
    }
}
