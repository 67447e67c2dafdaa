//! HTTP request tool.

use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use wayfarer_core::error::ToolError;
use wayfarer_core::tool::ToolResult;
use crate::args::{optional_str, required_str};

const ALLOWED_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD"];

pub(crate) async fn http_request(client: &reqwest::Client, args: &Value) -> Result<ToolResult, ToolError> {
    let url = required_str(args, "url")?.trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ToolError::InvalidArguments(
            "URL must start with http:// or https://".into(),
        ));
    }

    let method_name = optional_str(args, "method").unwrap_or("GET").to_uppercase();
    if !ALLOWED_METHODS.contains(&method_name.as_str()) {
        return Err(ToolError::InvalidArguments(format!(
            "Invalid HTTP method: {method_name}. Must be one of {}",
            ALLOWED_METHODS.join(", ")
        )));
    }
    let method = Method::from_bytes(method_name.as_bytes())
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

    let mut request = client.request(method, url);
    if let Some(Value::Object(headers)) = args.get("headers") {
        for (name, value) in headers {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            request = request.header(name.as_str(), value);
        }
    }
    if let Some(body) = args.get("body").and_then(Value::as_str) {
        request = request.body(body.to_string());
    }

    debug!(method = %method_name, url = %url, "Sending HTTP request");

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return Ok(ToolResult::failed(format!("Request failed: {e}"))),
    };

    let status = response.status();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return Ok(ToolResult::failed(format!("HTTP {status}: failed to read body: {e}"))),
    };

    let mut output = format!("HTTP {status}");
    if !content_type.is_empty() {
        output.push_str(&format!("\ncontent-type: {content_type}"));
    }
    if !body.is_empty() {
        output.push_str("\n\n");
        output.push_str(&body);
    }

    Ok(ToolResult {
        success: !status.is_client_error() && !status.is_server_error(),
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn get_returns_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let result = http_request(&client, &json!({"url": format!("{}/health", server.url())}))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(result.success);
        assert!(result.output.starts_with("HTTP 200 OK"));
        assert!(result.output.ends_with(r#"{"status":"ok"}"#));
    }

    #[tokio::test]
    async fn post_sends_headers_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/items")
            .match_header("x-token", "abc")
            .match_body(Matcher::Exact("name=widget".into()))
            .with_status(201)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let result = http_request(
            &client,
            &json!({
                "url": format!("{}/items", server.url()),
                "method": "post",
                "headers": {"x-token": "abc"},
                "body": "name=widget",
            }),
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert!(result.success);
        assert!(result.output.starts_with("HTTP 201"));
    }

    #[tokio::test]
    async fn error_status_is_a_failed_result() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/missing").with_status(404).create_async().await;

        let client = reqwest::Client::new();
        let result = http_request(&client, &json!({"url": format!("{}/missing", server.url())}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.starts_with("HTTP 404"));
    }

    #[tokio::test]
    async fn rejects_bad_arguments() {
        let client = reqwest::Client::new();
        let err = http_request(&client, &json!({"url": "ftp://example.com"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));

        let err = http_request(&client, &json!({"url": "https://example.com", "method": "TRACE"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
