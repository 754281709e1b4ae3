//! Inter-call pacing.
//!
//! Provider calls in a batch never overlap, and every call after the first
//! waits a fixed provider-specific delay. All waiting goes through [`Clock`]
//! so tests can observe delays without sleeping.

use crate::config::{MIN_REPLICATE_DELAY, PacingConfig};
use crate::provider::ProviderKind;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Source of delays.
#[async_trait]
pub trait Clock: Send + Sync + fmt::Debug {
    /// Suspend for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Delay between consecutive calls to `kind`.
pub fn pacing_delay(kind: ProviderKind, config: &PacingConfig) -> Duration {
    match kind {
        ProviderKind::SiliconFlow | ProviderKind::HuggingFace => config.delay,
        // Free tier allows a single request in flight per burst window
        ProviderKind::Replicate => config.replicate_delay.max(MIN_REPLICATE_DELAY),
    }
}

/// Sequencer for the calls of one batch.
#[derive(Debug, Clone)]
pub struct Pacer {
    delay: Duration,
    calls: usize,
}

impl Pacer {
    /// Create a pacer with a fixed delay.
    pub fn new(delay: Duration) -> Self {
        Self { delay, calls: 0 }
    }

    /// Create the pacer for a provider.
    pub fn for_provider(kind: ProviderKind, config: &PacingConfig) -> Self {
        Self::new(pacing_delay(kind, config))
    }

    /// The fixed delay between calls.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait until the next call may start.
    ///
    /// Returns immediately for the first call; afterwards waits the full
    /// delay. Callers must await the previous call before asking again.
    pub async fn wait_turn(&mut self, clock: &dyn Clock) {
        if self.calls > 0 && !self.delay.is_zero() {
            debug!(call = self.calls + 1, delay_ms = self.delay.as_millis() as u64, "Pacing");
            clock.sleep(self.delay).await;
        }
        self.calls += 1;
    }
}

/// Clock that records requested delays and returns at once.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingClock {
    sleeps: parking_lot::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl RecordingClock {
    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_per_provider() {
        let config = PacingConfig::default();
        assert_eq!(
            pacing_delay(ProviderKind::SiliconFlow, &config),
            Duration::from_millis(2000)
        );
        assert_eq!(
            pacing_delay(ProviderKind::HuggingFace, &config),
            Duration::from_millis(2000)
        );
        assert_eq!(
            pacing_delay(ProviderKind::Replicate, &config),
            Duration::from_millis(15000)
        );
    }

    #[test]
    fn test_replicate_delay_is_floored() {
        let config = PacingConfig {
            delay: Duration::from_millis(2000),
            replicate_delay: Duration::from_millis(500),
        };
        assert_eq!(
            pacing_delay(ProviderKind::Replicate, &config),
            MIN_REPLICATE_DELAY
        );
    }

    #[tokio::test]
    async fn test_first_call_is_not_delayed() {
        let clock = RecordingClock::default();
        let mut pacer = Pacer::new(Duration::from_secs(2));

        pacer.wait_turn(&clock).await;
        assert!(clock.sleeps().is_empty());

        pacer.wait_turn(&clock).await;
        pacer.wait_turn(&clock).await;
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2); 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_waits_full_delay() {
        let mut pacer = Pacer::new(Duration::from_secs(2));
        let start = tokio::time::Instant::now();

        pacer.wait_turn(&TokioClock).await;
        pacer.wait_turn(&TokioClock).await;
        pacer.wait_turn(&TokioClock).await;

        assert!(start.elapsed() >= Duration::from_secs(4));
    }
}
