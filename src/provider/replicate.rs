//! Replicate prediction adapter.
//!
//! Predictions are created with a `Prefer: wait=N` hint so Replicate holds the
//! request open until the output is ready (or the hint expires). The output
//! field comes in several shapes depending on the model; see
//! [`normalize_output`].

use super::{ImageProvider, ProviderKind};
use crate::client::{build_http_client, classify_transport_error, json_error_message, json_response};
use crate::config::ReplicateConfig;
use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, trace};

const ERROR_KEYS: &[&str] = &["detail", "error"];

/// Adapter for `POST {base}/v1/predictions`.
#[derive(Debug, Clone)]
pub struct ReplicateProvider {
    client: Client,
    token: String,
    endpoint: String,
    model: String,
    wait_seconds: u32,
}

impl ReplicateProvider {
    /// Create an adapter from its settings and API token.
    pub fn new(config: &ReplicateConfig, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config.timeout)?,
            token: token.into(),
            endpoint: format!("{}/v1/predictions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            wait_seconds: config.wait_seconds,
        })
    }
}

#[async_trait]
impl ImageProvider for ReplicateProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Replicate
    }

    async fn generate(&self, prompt: &str) -> std::result::Result<Option<String>, ProviderError> {
        trace!(endpoint = %self.endpoint, model = %self.model, "Creating prediction");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .header("Prefer", format!("wait={}", self.wait_seconds))
            .json(&json!({
                "version": self.model,
                "input": { "prompt": prompt },
            }))
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status().as_u16();
        let body = json_response(response, ERROR_KEYS).await?;

        let url = body.get("output").and_then(normalize_output);
        if url.is_none() {
            // A failed prediction still answers 2xx, with the reason in `error`
            if let Some(message) = json_error_message(&body, &["error"]) {
                return Err(ProviderError::application(Some(status), message));
            }
            let prediction_status = body
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            debug!(%prediction_status, "Prediction returned no output");
        }
        Ok(url)
    }
}

/// Normalize a prediction `output` to a single URL.
///
/// Accepted shapes: a URL string, an array whose first element is a string or
/// an object with `url`/`href`, or a single object with `url`/`href`.
pub fn normalize_output(output: &Value) -> Option<String> {
    match output {
        Value::String(url) if url.starts_with("http") => Some(url.clone()),
        Value::Array(items) => match items.first()? {
            Value::String(url) if !url.is_empty() => Some(url.clone()),
            item @ Value::Object(_) => link_field(item),
            _ => None,
        },
        Value::Object(_) => link_field(output),
        _ => None,
    }
}

fn link_field(object: &Value) -> Option<String> {
    ["url", "href"].iter().find_map(|key| {
        object
            .get(*key)
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    })
}
