//! Batch orchestration for image generation.
//!
//! A batch selects one provider up front, then walks the prompts strictly in
//! order: wait for the pacing delay, run the (possibly retried) provider call
//! to completion, record the outcome. A failed prompt becomes an outcome with
//! `error` set; only configuration problems abort the batch.
//!
//! Batches from different callers are not coordinated with each other, so
//! concurrent batches against the same provider can exceed its upstream quota.

use crate::config::{Config, CredentialStore};
use crate::error::{Result, ShopfrontError};
use crate::pacing::{Clock, Pacer, TokioClock};
use crate::provider::{ImageProvider, ProviderKind};
use crate::request::GenerationOutcome;
use crate::retry::RetryPolicy;
use crate::selector::select_provider;
use crate::tracker::{BatchTracker, StatsSnapshot};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Drives batches of prompts through the selected provider.
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    config: Arc<Config>,
    credentials: Arc<CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl BatchOrchestrator {
    /// Create an orchestrator using the tokio timer for delays.
    pub fn new(config: Config, credentials: Arc<CredentialStore>) -> Self {
        Self {
            config: Arc::new(config),
            credentials,
            clock: Arc::new(TokioClock),
        }
    }

    /// Replace the clock used for pacing and retry delays.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Select the provider adapter from the current credentials.
    pub fn select_provider(&self) -> Result<Box<dyn ImageProvider>> {
        let credentials = self.credentials.snapshot();
        select_provider(&credentials, &self.config)
    }

    /// Generate one image per prompt.
    pub async fn generate_batch(&self, prompts: &[String]) -> Result<BatchResult> {
        self.generate_batch_with(prompts, |_, _| {}).await
    }

    /// Generate one image per prompt, calling `on_outcome` as each completes.
    pub async fn generate_batch_with<F>(&self, prompts: &[String], on_outcome: F) -> Result<BatchResult>
    where
        F: FnMut(usize, &GenerationOutcome),
    {
        if prompts.is_empty() {
            return Err(ShopfrontError::EmptyBatch);
        }

        let provider = self.select_provider()?;
        Ok(self.run_batch(provider.as_ref(), prompts, on_outcome).await)
    }

    /// Run a batch against an already selected provider.
    pub async fn run_batch<F>(
        &self,
        provider: &dyn ImageProvider,
        prompts: &[String],
        mut on_outcome: F,
    ) -> BatchResult
    where
        F: FnMut(usize, &GenerationOutcome),
    {
        let kind = provider.kind();
        let mut pacer = Pacer::for_provider(kind, &self.config.pacing);
        let retry = RetryPolicy::for_provider(kind, &self.config.retry);
        let tracker = BatchTracker::new(prompts.len());

        info!(
            provider = %kind,
            prompts = prompts.len(),
            delay_ms = pacer.delay().as_millis() as u64,
            max_attempts = retry.max_attempts(),
            "Starting batch"
        );

        let mut outcomes = Vec::with_capacity(prompts.len());
        for (index, prompt) in prompts.iter().enumerate() {
            pacer.wait_turn(self.clock.as_ref()).await;

            let started = Instant::now();
            let outcome = self.generate_with(provider, &retry, index, prompt.trim()).await;
            tracker.record(&outcome, started.elapsed());

            on_outcome(index, &outcome);
            outcomes.push(outcome);
        }

        let stats = tracker.snapshot();
        info!(provider = %kind, "{}", stats.summary());

        BatchResult {
            provider: kind,
            outcomes,
            stats,
        }
    }

    /// Generate a single image without pacing.
    pub async fn generate_one(&self, prompt: &str) -> Result<GenerationOutcome> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ShopfrontError::InvalidPromptInput(
                "prompt is empty".to_string(),
            ));
        }

        let provider = self.select_provider()?;
        let retry = RetryPolicy::for_provider(provider.kind(), &self.config.retry);
        Ok(self.generate_with(provider.as_ref(), &retry, 0, prompt).await)
    }

    async fn generate_with(
        &self,
        provider: &dyn ImageProvider,
        retry: &RetryPolicy,
        index: usize,
        prompt: &str,
    ) -> GenerationOutcome {
        debug!(index, provider = %provider.kind(), "Generating image");

        let result = retry
            .run(self.clock.as_ref(), move || provider.generate(prompt))
            .await;

        match &result {
            Ok(Some(_)) => debug!(index, "Image generated"),
            Ok(None) => warn!(index, provider = %provider.kind(), "Provider returned no image"),
            Err(e) => warn!(
                index,
                provider = %provider.kind(),
                status = ?e.status(),
                error = %e,
                "Image generation failed"
            ),
        }

        GenerationOutcome::from_result(prompt, result)
    }
}

/// Result of one batch.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// The provider that served every prompt.
    pub provider: ProviderKind,
    /// One outcome per prompt, in prompt order.
    pub outcomes: Vec<GenerationOutcome>,
    /// Batch statistics.
    pub stats: StatsSnapshot,
}

impl BatchResult {
    /// Number of outcomes with an image.
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Whether no prompt produced an image.
    pub fn all_failed(&self) -> bool {
        self.success_count() == 0
    }
}
