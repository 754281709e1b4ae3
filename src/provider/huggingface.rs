//! Hugging Face Inference API adapter.
//!
//! The inference endpoint answers with raw image bytes, which are inlined as
//! a `data:` URL so callers get the same string-shaped result as from the
//! hosted providers.

use super::{ImageProvider, ProviderKind};
use crate::client::{build_http_client, classify_transport_error, error_response};
use crate::config::HuggingFaceConfig;
use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, header};
use serde_json::json;
use tracing::trace;

const ERROR_KEYS: &[&str] = &["error"];
const DEFAULT_CONTENT_TYPE: &str = "image/png";

/// Adapter for `POST {base}/models/{model}`.
#[derive(Debug, Clone)]
pub struct HuggingFaceProvider {
    client: Client,
    token: String,
    endpoint: String,
}

impl HuggingFaceProvider {
    /// Create an adapter from its settings and access token.
    pub fn new(config: &HuggingFaceConfig, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config.timeout)?,
            token: token.into(),
            endpoint: format!(
                "{}/models/{}",
                config.base_url.trim_end_matches('/'),
                config.model.trim()
            ),
        })
    }
}

#[async_trait]
impl ImageProvider for HuggingFaceProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HuggingFace
    }

    async fn generate(&self, prompt: &str) -> std::result::Result<Option<String>, ProviderError> {
        trace!(endpoint = %self.endpoint, "Sending request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({ "inputs": prompt }))
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        if !response.status().is_success() {
            return Err(error_response(response, ERROR_KEYS).await);
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        if bytes.is_empty() {
            return Ok(None);
        }

        Ok(Some(data_url(&content_type, &bytes)))
    }
}

/// Encode image bytes as a self-contained `data:` URL.
pub fn data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{content_type};base64,{}", BASE64.encode(bytes))
}
