//! Statistics tracking for a batch.
//!
//! Counts successes and failures, and accumulates per-call latency.

use crate::request::GenerationOutcome;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Statistics tracker for one batch.
#[derive(Debug)]
pub struct BatchTracker {
    /// Start time of the batch.
    start_time: Instant,
    /// Number of prompts in the batch.
    total_prompts: usize,
    /// Outcomes with an image.
    success_count: AtomicU64,
    /// Outcomes without an image.
    failure_count: AtomicU64,
    /// Total call latency in microseconds, pacing excluded.
    total_latency_us: AtomicU64,
}

impl BatchTracker {
    /// Create a tracker for a batch of `total_prompts`.
    pub fn new(total_prompts: usize) -> Self {
        Self {
            start_time: Instant::now(),
            total_prompts,
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
        }
    }

    /// Record one outcome and the time spent producing it.
    pub fn record(&self, outcome: &GenerationOutcome, latency: Duration) {
        if outcome.is_success() {
            self.success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_us
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    /// Get the current statistics snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        let success = self.success_count.load(Ordering::Relaxed);
        let failure = self.failure_count.load(Ordering::Relaxed);
        let total = success + failure;
        let total_latency = self.total_latency_us.load(Ordering::Relaxed);

        let avg_latency_ms = if total > 0 {
            (total_latency as f64 / total as f64) / 1000.0
        } else {
            0.0
        };

        StatsSnapshot {
            elapsed: self.start_time.elapsed(),
            total_prompts: self.total_prompts,
            total_processed: total,
            success_count: success,
            failure_count: failure,
            avg_latency_ms,
        }
    }
}

/// A snapshot of batch statistics.
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    /// Elapsed time since the batch started, pacing included.
    pub elapsed: Duration,
    /// Prompts in the batch.
    pub total_prompts: usize,
    /// Prompts processed so far.
    pub total_processed: u64,
    /// Outcomes with an image.
    pub success_count: u64,
    /// Outcomes without an image.
    pub failure_count: u64,
    /// Average call latency in milliseconds.
    pub avg_latency_ms: f64,
}

impl StatsSnapshot {
    /// Get the success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        if self.total_processed > 0 {
            (self.success_count as f64 / self.total_processed as f64) * 100.0
        } else {
            100.0
        }
    }

    /// Format as a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Processed: {}/{} | Images: {} | Failed: {} | Avg Latency: {:.0}ms | Elapsed: {:.1}s",
            self.total_processed,
            self.total_prompts,
            self.success_count,
            self.failure_count,
            self.avg_latency_ms,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_tracking() {
        let tracker = BatchTracker::new(3);

        tracker.record(
            &GenerationOutcome::completed("a", Some("u1".to_string())),
            Duration::from_millis(50),
        );
        tracker.record(
            &GenerationOutcome::completed("b", Some("u2".to_string())),
            Duration::from_millis(100),
        );
        tracker.record(
            &GenerationOutcome::failed("c", "boom"),
            Duration::from_millis(150),
        );

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.total_processed, 3);
        assert_eq!(snapshot.success_count, 2);
        assert_eq!(snapshot.failure_count, 1);
        assert_eq!(snapshot.avg_latency_ms, 100.0);
    }

    #[test]
    fn test_success_rate() {
        let tracker = BatchTracker::new(10);

        for _ in 0..8 {
            tracker.record(
                &GenerationOutcome::completed("p", Some("u".to_string())),
                Duration::from_millis(10),
            );
        }
        for _ in 0..2 {
            tracker.record(&GenerationOutcome::completed("p", None), Duration::ZERO);
        }

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.success_rate(), 80.0);
        assert!(snapshot.summary().starts_with("Processed: 10/10"));
    }
}
