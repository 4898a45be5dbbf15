//! Time abstractions for testability
//!
//! Polling, retry backoff and the inter-VM throttle all wait through the
//! [`Clock`] trait so tests can run a ten-minute migration timeout in
//! microseconds of wall time.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Instant in time (monotonic clock)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant(u64); // Microseconds since the clock's origin

impl Instant {
    /// Create from microseconds
    pub fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Duration since another instant
    pub fn duration_since(&self, earlier: Instant) -> Duration {
        let micros = self.0.saturating_sub(earlier.0);
        Duration::from_micros(micros)
    }
}

/// Abstraction for time operations
#[async_trait]
pub trait Clock: Send + Sync {
    /// Get current instant (monotonic)
    fn now(&self) -> Instant;

    /// Sleep for a duration
    async fn sleep(&self, duration: Duration);
}

/// Production clock backed by the tokio timer
pub struct SystemClock {
    origin: std::time::Instant,
}

impl SystemClock {
    /// Create new instance
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.origin.elapsed().as_micros() as u64)
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Simulated clock for deterministic testing
///
/// `sleep` returns immediately after advancing the simulated time by the
/// requested duration. Every sleep is recorded so tests can assert on the
/// exact waits the code under test performed.
#[derive(Clone, Default)]
pub struct SimulatedClock {
    current_micros: Arc<AtomicU64>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl SimulatedClock {
    /// Create new simulated clock starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance time without recording a sleep
    pub fn advance(&self, duration: Duration) {
        self.current_micros
            .fetch_add(duration.as_micros() as u64, Ordering::SeqCst);
    }

    /// Total simulated time elapsed since creation
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.current_micros.load(Ordering::SeqCst))
    }

    /// All sleeps performed so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Clock for SimulatedClock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.current_micros.load(Ordering::SeqCst))
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(duration);
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_clock_sleep_advances_time() {
        let clock = SimulatedClock::new();
        let start = clock.now();

        clock.sleep(Duration::from_secs(10)).await;
        clock.sleep(Duration::from_secs(30)).await;

        assert_eq!(clock.now().duration_since(start), Duration::from_secs(40));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(10), Duration::from_secs(30)]
        );
    }

    #[tokio::test]
    async fn test_simulated_clock_clones_share_time() {
        let clock = SimulatedClock::new();
        let other = clock.clone();

        other.sleep(Duration::from_secs(5)).await;
        clock.advance(Duration::from_secs(1));

        assert_eq!(clock.elapsed(), Duration::from_secs(6));
        assert_eq!(other.sleeps().len(), 1);
    }

    #[tokio::test]
    async fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now();
        clock.sleep(Duration::from_millis(5)).await;
        let second = clock.now();

        assert!(second > first);
        assert!(second.duration_since(first) >= Duration::from_millis(5));
    }

    #[test]
    fn test_instant_saturates() {
        let earlier = Instant::from_micros(100);
        let later = Instant::from_micros(50);
        assert_eq!(later.duration_since(earlier), Duration::ZERO);
        assert_eq!(
            Instant::from_micros(1_100).duration_since(earlier),
            Duration::from_millis(1)
        );
    }
}
