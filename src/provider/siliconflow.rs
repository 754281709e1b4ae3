//! SiliconFlow image generation adapter.

use super::{ImageProvider, ProviderKind};
use crate::client::{build_http_client, classify_transport_error, json_response};
use crate::config::SiliconFlowConfig;
use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::trace;

const ERROR_KEYS: &[&str] = &["message", "error"];

/// Adapter for `POST {base}/v1/images/generations`.
#[derive(Debug, Clone)]
pub struct SiliconFlowProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    config: SiliconFlowConfig,
}

impl SiliconFlowProvider {
    /// Create an adapter from its settings and API key.
    pub fn new(config: &SiliconFlowConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config.timeout)?,
            api_key: api_key.into(),
            endpoint: format!(
                "{}/v1/images/generations",
                config.base_url.trim_end_matches('/')
            ),
            config: config.clone(),
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.config.model,
            "prompt": prompt,
            "image_size": self.config.image_size,
            "batch_size": 1,
            "num_inference_steps": self.config.num_inference_steps,
            "guidance_scale": self.config.guidance_scale,
        })
    }
}

#[async_trait]
impl ImageProvider for SiliconFlowProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SiliconFlow
    }

    async fn generate(&self, prompt: &str) -> std::result::Result<Option<String>, ProviderError> {
        trace!(endpoint = %self.endpoint, model = %self.config.model, "Sending request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let body = json_response(response, ERROR_KEYS).await?;
        Ok(first_image_url(&body))
    }
}

/// Extract `images[0].url` from a generation response.
pub fn first_image_url(body: &Value) -> Option<String> {
    body.pointer("/images/0/url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> SiliconFlowProvider {
        let config = SiliconFlowConfig {
            base_url: format!("{}/", server.uri()),
            timeout: Duration::from_secs(5),
            ..SiliconFlowConfig::default()
        };
        SiliconFlowProvider::new(&config, "sk-test").unwrap()
    }

    #[tokio::test]
    async fn test_returns_first_image_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "Kwai-Kolors/Kolors",
                "prompt": "a ceramic cat bowl",
                "batch_size": 1,
                "image_size": "1024x1024"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [{"url": "https://cdn.test/1.png"}, {"url": "https://cdn.test/2.png"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = provider(&server).generate("a ceramic cat bowl").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://cdn.test/1.png"));
    }

    #[tokio::test]
    async fn test_missing_images_resolves_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"images": []})))
            .mount(&server)
            .await;

        assert_eq!(provider(&server).generate("x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_error_status_uses_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"code": 20016, "message": "Invalid token"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = provider(&server).generate("x").await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::Application {
                status: Some(401),
                message: "Invalid token".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_application_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = provider(&server).generate("x").await.unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(err.status(), Some(200));
    }
}
