//! Bounded, fixed-delay retry for transient transport failures.
//!
//! Only [`ProviderError::Transient`] failures are retried. Status errors and
//! malformed payloads are returned after the first attempt: rate limits and
//! validation failures do not heal by themselves and retrying them burns quota.

use crate::config::{MAX_RETRIES_CAP, RetryConfig};
use crate::error::ProviderError;
use crate::pacing::Clock;
use crate::provider::ProviderKind;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy applied around a single provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy; `max_attempts` is clamped to `1..=5`.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_RETRIES_CAP),
            delay,
        }
    }

    /// A policy that never retries.
    pub fn single_shot() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    /// Build from configuration.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay)
    }

    /// The policy for a provider: only the free-inference provider retries.
    pub fn for_provider(kind: ProviderKind, config: &RetryConfig) -> Self {
        match kind {
            ProviderKind::HuggingFace => Self::from_config(config),
            ProviderKind::SiliconFlow | ProviderKind::Replicate => Self::single_shot(),
        }
    }

    /// Maximum number of attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause between attempts.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// On exhaustion the last observed error is returned.
    pub async fn run<F, Fut, T>(&self, clock: &dyn Clock, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Retry succeeded");
                    }
                    return Ok(value);
                }
                Err(error) if error.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = self.delay.as_millis() as u64,
                        error = %error,
                        "Transient failure, retrying"
                    );
                    clock.sleep(self.delay).await;
                }
                Err(error) => {
                    if error.is_retryable() {
                        warn!(attempts = attempt, error = %error, "Retries exhausted");
                    }
                    return Err(error);
                }
            }
        }
    }
}
