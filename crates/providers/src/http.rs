//! Shared HTTP plumbing for the backends.
//!
//! Non-2xx responses are never turned into transport errors by reqwest;
//! the body is always read so [`classify`](crate::classify::classify) can
//! inspect the provider's structured error detail.

use serde_json::Value;
use std::time::Duration;
use tracing::{trace, warn};
use wayfarer_core::ProviderError;
use crate::classify::classify;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Build an HTTP client with the given timeout.
pub(crate) fn client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build HTTP client with timeout, using defaults");
            reqwest::Client::default()
        })
}

/// Who is being called, for error classification and logging.
pub(crate) struct Target<'a> {
    pub provider: &'a str,
    pub model: &'a str,
}

async fn send(
    target: &Target<'_>,
    request: reqwest::RequestBuilder,
    body: &Value,
) -> Result<reqwest::Response, ProviderError> {
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?;

    let status = response.status().as_u16();
    if status >= 400 {
        let error_body = response.text().await.unwrap_or_default();
        warn!(provider = target.provider, status, body = %error_body, "Provider returned error");
        return Err(classify(target.provider, target.model, status, &error_body));
    }
    Ok(response)
}

/// POST a JSON body and parse a JSON reply.
pub(crate) async fn post_json(
    target: &Target<'_>,
    request: reqwest::RequestBuilder,
    body: &Value,
) -> Result<Value, ProviderError> {
    let response = send(target, request, body).await?;
    let text = response
        .text()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?;
    trace!(provider = target.provider, body = %text, "Provider response");

    serde_json::from_str(&text).map_err(|e| {
        ProviderError::InvalidResponse(format!("{} returned malformed JSON: {e}", target.provider))
    })
}

/// POST a JSON body and hand back the successful response for streaming.
pub(crate) async fn post_stream(
    target: &Target<'_>,
    request: reqwest::RequestBuilder,
    body: &Value,
) -> Result<reqwest::Response, ProviderError> {
    send(target, request, body).await
}
