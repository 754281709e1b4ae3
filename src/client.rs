//! HTTP plumbing shared by the provider adapters.
//!
//! Builds pooled clients, sorts transport failures into retryable and
//! non-retryable kinds, and pulls a readable message out of provider error
//! bodies.

use crate::error::{ProviderError, Result, ShopfrontError, TransientKind};
use reqwest::{Client, Response, header};
use serde_json::Value;
use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use tracing::trace;

/// Maximum number of characters kept from a provider error message.
pub const MAX_ERROR_CHARS: usize = 200;

/// Build an HTTP client with the given per-request timeout.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_static(concat!("shopfront/", env!("CARGO_PKG_VERSION"))),
    );

    Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        .default_headers(headers)
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(ShopfrontError::HttpClient)
}

/// Classify a reqwest failure.
///
/// Only a dropped connection, a connect timeout and an elapsed request
/// timeout are transient. Everything else (DNS, refused, TLS, decode) is final.
/// A peer that closes the socket before answering counts as a reset.
pub fn classify_transport_error(err: &reqwest::Error) -> ProviderError {
    let message = error_chain(err);

    if connection_dropped(err) {
        return ProviderError::Transient {
            kind: TransientKind::ConnectionReset,
            message,
        };
    }

    if err.is_timeout() || io_error_kind(err) == Some(io::ErrorKind::TimedOut) {
        let kind = if err.is_connect() {
            TransientKind::ConnectTimeout
        } else {
            TransientKind::RequestTimeout
        };
        return ProviderError::Transient { kind, message };
    }

    ProviderError::Network { message }
}

fn causes<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(err.source(), |&cause| cause.source())
}

fn connection_dropped(err: &(dyn StdError + 'static)) -> bool {
    causes(err).any(|cause| {
        cause
            .downcast_ref::<hyper::Error>()
            .is_some_and(hyper::Error::is_incomplete_message)
            || cause.downcast_ref::<io::Error>().is_some_and(|e| {
                matches!(
                    e.kind(),
                    io::ErrorKind::ConnectionReset
                        | io::ErrorKind::ConnectionAborted
                        | io::ErrorKind::BrokenPipe
                        | io::ErrorKind::UnexpectedEof
                )
            })
    })
}

fn io_error_kind(err: &(dyn StdError + 'static)) -> Option<io::ErrorKind> {
    causes(err).find_map(|cause| cause.downcast_ref::<io::Error>().map(io::Error::kind))
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Pick the first usable message under `keys` in a provider error body.
///
/// String values are taken as-is; an object value contributes its `message`
/// field when present, otherwise its JSON text.
pub fn json_error_message(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match body.get(*key)? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(Value::Object(map.clone()).to_string())),
        other => Some(other.to_string()),
    })
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Turn a non-2xx response into an application error.
pub(crate) async fn error_response(response: Response, keys: &[&str]) -> ProviderError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    trace!(status = status.as_u16(), body = %truncate_chars(&text, MAX_ERROR_CHARS), "Provider error body");

    // Raw text is only surfaced for non-JSON bodies
    let message = match serde_json::from_str::<Value>(&text) {
        Ok(body) => json_error_message(&body, keys),
        Err(_) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
    }
    .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));

    ProviderError::application(Some(status.as_u16()), message)
}

/// Read a JSON body, mapping error statuses and malformed payloads to application errors.
pub(crate) async fn json_response(
    response: Response,
    keys: &[&str],
) -> std::result::Result<Value, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        return Err(error_response(response, keys).await);
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| classify_transport_error(&e))?;

    serde_json::from_slice(&bytes).map_err(|e| {
        ProviderError::application(
            Some(status.as_u16()),
            format!("failed to parse response: {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_error_message_prefers_key_order() {
        let body = json!({"error": "bad token", "message": "Invalid prompt"});
        assert_eq!(
            json_error_message(&body, &["message", "error"]).as_deref(),
            Some("Invalid prompt")
        );
        assert_eq!(
            json_error_message(&body, &["detail", "error"]).as_deref(),
            Some("bad token")
        );
    }

    #[test]
    fn test_json_error_message_unwraps_nested_message() {
        let body = json!({"error": {"code": 20015, "message": "quota exceeded"}, "detail": null});
        assert_eq!(
            json_error_message(&body, &["detail", "error"]).as_deref(),
            Some("quota exceeded")
        );
        assert_eq!(json_error_message(&json!({"code": 1}), &["error"]), None);
    }

    #[test]
    fn test_truncate_chars_respects_code_points() {
        let message = "生图失败".repeat(100);
        let truncated = truncate_chars(&message, MAX_ERROR_CHARS);
        assert_eq!(truncated.chars().count(), MAX_ERROR_CHARS);
        assert_eq!(truncate_chars("short", MAX_ERROR_CHARS), "short");
    }

    #[tokio::test]
    async fn test_refused_connection_is_not_transient() {
        // Bind then drop to obtain a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = build_http_client(Duration::from_secs(5)).unwrap();
        let err = client
            .get(format!("http://{addr}/"))
            .send()
            .await
            .expect_err("nothing is listening");

        let classified = classify_transport_error(&err);
        assert!(!classified.is_retryable(), "{classified:?}");
    }

    #[tokio::test]
    async fn test_elapsed_timeout_is_transient() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::any())
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = build_http_client(Duration::from_millis(50)).unwrap();
        let err = client
            .get(server.uri())
            .send()
            .await
            .expect_err("request should time out");

        let classified = classify_transport_error(&err);
        assert!(
            matches!(
                classified,
                ProviderError::Transient {
                    kind: TransientKind::RequestTimeout,
                    ..
                }
            ),
            "{classified:?}"
        );
    }

    #[tokio::test]
    async fn test_connection_closed_before_response_is_reset() {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Read the request, then hang up without answering
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
        });

        let client = build_http_client(Duration::from_secs(5)).unwrap();
        let err = client
            .post(format!("http://{addr}/v1/images/generations"))
            .body(r#"{"prompt":"x"}"#)
            .send()
            .await
            .expect_err("peer hung up");

        let classified = classify_transport_error(&err);
        assert!(classified.is_retryable(), "{classified:?}");
        assert!(
            matches!(
                classified,
                ProviderError::Transient {
                    kind: TransientKind::ConnectionReset,
                    ..
                }
            ),
            "{classified:?}"
        );
    }

    #[tokio::test]
    async fn test_error_body_without_known_keys_reports_status() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/json"))
            .respond_with(
                wiremock::ResponseTemplate::new(422).set_body_json(json!({"code": 20012})),
            )
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::path("/text"))
            .respond_with(wiremock::ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let client = build_http_client(Duration::from_secs(5)).unwrap();

        let response = client.get(format!("{}/json", server.uri())).send().await.unwrap();
        let err = error_response(response, &["message", "error"]).await;
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.to_string(), "Request failed with status code 422");

        let response = client.get(format!("{}/text", server.uri())).send().await.unwrap();
        let err = error_response(response, &["message", "error"]).await;
        assert_eq!(err.to_string(), "Bad Gateway");
    }
}
