//! # Shopfront
//!
//! Multi-provider image generation for e-commerce listings.
//!
//! Shopfront takes an ordered list of image prompts and returns one outcome per
//! prompt, in the same order, using whichever image provider is configured:
//!
//! 1. **SiliconFlow** (domestic, fast): hosted image URLs.
//! 2. **Hugging Face Inference** (free): raw bytes, returned as `data:` URLs,
//!    with bounded retries on transient network failures.
//! 3. **Replicate** (paid): predictions with a server-side wait hint and a
//!    long inter-call delay for its burst limit.
//!
//! ## Features
//!
//! - **Priority Selection**: one provider per batch, picked from configured credentials
//! - **Pacing**: calls never overlap; a provider-specific delay separates them
//! - **Narrow Retries**: only connection resets and timeouts are retried
//! - **Partial Failure**: a failed image is reported in-band, the batch continues
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shopfront::{BatchOrchestrator, Config, CredentialStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let credentials = Arc::new(CredentialStore::from_environment(vec![".env".into()]));
//!     let orchestrator = BatchOrchestrator::new(Config::default(), credentials);
//!
//!     let prompts = vec![
//!         "cat bowl on a pure white background, studio lighting".to_string(),
//!         "cat bowl in a Tokyo apartment, soft natural sunlight".to_string(),
//!     ];
//!     let result = orchestrator.generate_batch(&prompts).await?;
//!
//!     for outcome in &result.outcomes {
//!         println!("{} -> {:?} {:?}", outcome.prompt, outcome.url, outcome.error);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Settings come from command-line arguments, environment variables
//! (`SILICONFLOW_IMAGE_MODEL`, `HF_MAX_RETRIES`, `REPLICATE_DELAY_MS`, ...) and
//! JSON configuration files. Credentials (`SILICONFLOW_API_KEY`, `HF_TOKEN`,
//! `REPLICATE_API_TOKEN`) come from the environment or `.env`-style files.
//!
//! See [`Config`] and [`CredentialStore`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pacing;
pub mod provider;
pub mod request;
pub mod retry;
pub mod selector;
pub mod tracker;

// Re-exports for convenience
pub use config::{Args, Config, CredentialStore, Credentials, PacingConfig, RetryConfig};
pub use error::{ProviderError, Result, ShopfrontError, TransientKind};
pub use orchestrator::{BatchOrchestrator, BatchResult};
pub use pacing::{Clock, Pacer, TokioClock};
pub use provider::{ImageProvider, ProviderKind};
pub use request::{GenerationOutcome, ImageKind, parse_prompts};
pub use retry::RetryPolicy;
pub use selector::{select_kind, select_provider};
pub use tracker::{BatchTracker, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
