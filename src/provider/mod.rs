//! Image provider adapters.
//!
//! Each adapter wraps one external image API behind [`ImageProvider`]. An
//! adapter performs exactly one attempt per call; retries and pacing are
//! applied by the orchestrator so every provider shares the same policy code.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod huggingface;
pub mod replicate;
pub mod siliconflow;

pub use huggingface::HuggingFaceProvider;
pub use replicate::ReplicateProvider;
pub use siliconflow::SiliconFlowProvider;

/// The supported image providers, in selection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// SiliconFlow: domestic, fast, returns a hosted image URL.
    SiliconFlow,
    /// Hugging Face Inference API: free, returns raw image bytes.
    HuggingFace,
    /// Replicate predictions: paid, strict burst limit.
    Replicate,
}

impl ProviderKind {
    /// All providers, highest priority first.
    pub const PRIORITY: [Self; 3] = [Self::SiliconFlow, Self::HuggingFace, Self::Replicate];

    /// Short machine-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::SiliconFlow => "siliconflow",
            Self::HuggingFace => "huggingface",
            Self::Replicate => "replicate",
        }
    }

    /// Name for display.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::SiliconFlow => "SiliconFlow (domestic, fast)",
            Self::HuggingFace => "Hugging Face Inference (free)",
            Self::Replicate => "Replicate (paid)",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Uniform call contract for an image provider.
#[async_trait]
pub trait ImageProvider: Send + Sync + fmt::Debug {
    /// Which provider this adapter talks to.
    fn kind(&self) -> ProviderKind;

    /// Generate one image for `prompt` in a single attempt.
    ///
    /// Returns `Ok(None)` when the provider answered successfully but without
    /// an image in the expected place.
    async fn generate(&self, prompt: &str) -> Result<Option<String>, ProviderError>;
}
