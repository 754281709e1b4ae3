//! Provider selection.
//!
//! One provider serves a whole batch. It is the highest-priority provider
//! with a credential: SiliconFlow, then Hugging Face, then Replicate.

use crate::config::{Config, Credentials};
use crate::error::{Result, ShopfrontError};
use crate::provider::{
    HuggingFaceProvider, ImageProvider, ProviderKind, ReplicateProvider, SiliconFlowProvider,
};
use tracing::debug;

/// Credential for `kind`, if configured.
fn credential_for(kind: ProviderKind, credentials: &Credentials) -> Option<&str> {
    match kind {
        ProviderKind::SiliconFlow => credentials.siliconflow_api_key.as_deref(),
        ProviderKind::HuggingFace => credentials.hf_token.as_deref(),
        ProviderKind::Replicate => credentials.replicate_token.as_deref(),
    }
}

/// Pick the provider kind for a batch.
pub fn select_kind(credentials: &Credentials) -> Result<ProviderKind> {
    ProviderKind::PRIORITY
        .into_iter()
        .find(|kind| credential_for(*kind, credentials).is_some())
        .ok_or(ShopfrontError::NoProviderConfigured)
}

/// Pick and construct the provider adapter for a batch.
pub fn select_provider(
    credentials: &Credentials,
    config: &Config,
) -> Result<Box<dyn ImageProvider>> {
    let kind = select_kind(credentials)?;
    let credential = credential_for(kind, credentials).ok_or(ShopfrontError::NoProviderConfigured)?;
    debug!(provider = %kind, "Selected image provider");

    let provider: Box<dyn ImageProvider> = match kind {
        ProviderKind::SiliconFlow => {
            Box::new(SiliconFlowProvider::new(&config.siliconflow, credential)?)
        }
        ProviderKind::HuggingFace => {
            Box::new(HuggingFaceProvider::new(&config.huggingface, credential)?)
        }
        ProviderKind::Replicate => Box::new(ReplicateProvider::new(&config.replicate, credential)?),
    };
    Ok(provider)
}
