//! Error classification for non-2xx provider responses.
//!
//! Every backend reports failures in its own envelope:
//!
//! - OpenAI / compatible: `{"error": {"message", "type", "code"}}`
//! - Groq adds `"failed_generation"` when it rejects a tool call
//! - Anthropic: `{"type": "error", "error": {"type", "message"}}`
//! - Ollama: `{"error": "model 'x' not found"}`
//!
//! [`classify`] folds all of them into one [`ProviderError`].

use serde_json::Value;
use wayfarer_core::ProviderError;

/// The fields we care about, pulled out of any known error envelope.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ErrorDetail {
    pub code: Option<String>,
    pub kind: Option<String>,
    pub message: String,
    pub failed_generation: Option<String>,
}

impl ErrorDetail {
    /// Extract error detail from a raw response body.
    ///
    /// Bodies that are not JSON keep their (trimmed) text as the message.
    pub fn from_body(body: &str) -> Self {
        let Ok(json) = serde_json::from_str::<Value>(body) else {
            return Self {
                message: body.trim().to_string(),
                ..Self::default()
            };
        };

        match &json["error"] {
            Value::String(message) => Self {
                message: message.clone(),
                ..Self::default()
            },
            Value::Object(error) => {
                let text = |key: &str| error.get(key).and_then(Value::as_str).map(String::from);
                Self {
                    // Some servers send numeric codes
                    code: text("code").or_else(|| {
                        error.get("code").filter(|c| c.is_number()).map(|c| c.to_string())
                    }),
                    kind: text("type"),
                    message: text("message").unwrap_or_default(),
                    failed_generation: text("failed_generation"),
                }
            }
            _ => Self {
                message: json["message"].as_str().unwrap_or_default().to_string(),
                ..Self::default()
            },
        }
    }

    fn code_is(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }

    fn kind_is(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    fn mentions(&self, needle: &str) -> bool {
        self.message.to_ascii_lowercase().contains(needle)
    }
}

/// Classify a failed response into a [`ProviderError`].
pub fn classify(provider: &str, model: &str, status: u16, body: &str) -> ProviderError {
    let detail = ErrorDetail::from_body(body);
    classify_detail(provider, model, status, detail)
}

/// Classify already-extracted error detail.
pub fn classify_detail(provider: &str, model: &str, status: u16, detail: ErrorDetail) -> ProviderError {
    let provider = provider.to_string();

    if detail.code_is("tool_use_failed") || detail.mentions("failed to call a function") {
        return ProviderError::ToolCallMalformed {
            status_code: status,
            failed_generation: detail.failed_generation,
        };
    }

    if status == 401
        || status == 403
        || detail.code_is("invalid_api_key")
        || detail.kind_is("authentication_error")
        || detail.kind_is("permission_error")
    {
        return ProviderError::InvalidKey { provider };
    }

    if detail.code_is("insufficient_quota")
        || detail.mentions("quota")
        || detail.mentions("billing")
        || detail.mentions("credit balance")
    {
        return ProviderError::QuotaExceeded { provider };
    }

    if status == 429 || detail.kind_is("rate_limit_error") || detail.code_is("rate_limit_exceeded") {
        return ProviderError::RateLimited { provider };
    }

    if status == 404
        || detail.code_is("model_not_found")
        || (detail.mentions("model") && detail.mentions("not found"))
    {
        return ProviderError::ModelNotFound {
            model: model.to_string(),
        };
    }

    if detail.code_is("context_length_exceeded")
        || detail.mentions("context length")
        || detail.mentions("maximum context")
        || detail.mentions("prompt is too long")
        || detail.mentions("too many tokens")
    {
        return ProviderError::ContextTooLong;
    }

    if status == 529 || detail.kind_is("overloaded_error") {
        return ProviderError::Overloaded {
            provider,
            status_code: status,
        };
    }

    let message = if detail.message.is_empty() {
        format!("HTTP {status}")
    } else {
        detail.message
    };
    ProviderError::Api {
        status_code: status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_core::ProviderErrorKind;

    fn kind(status: u16, body: &str) -> ProviderErrorKind {
        classify("openai", "gpt-4o-mini", status, body).kind()
    }

    #[test]
    fn openai_invalid_key() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        assert_eq!(kind(401, body), ProviderErrorKind::InvalidKey);
    }

    #[test]
    fn openai_quota_vs_rate_limit() {
        let quota = r#"{"error":{"message":"You exceeded your current quota","type":"insufficient_quota","code":"insufficient_quota"}}"#;
        assert_eq!(kind(429, quota), ProviderErrorKind::QuotaExceeded);

        let rate = r#"{"error":{"message":"Rate limit reached for requests","type":"requests","code":"rate_limit_exceeded"}}"#;
        assert_eq!(kind(429, rate), ProviderErrorKind::RateLimited);
    }

    #[test]
    fn anthropic_shapes() {
        let overloaded = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err = classify("anthropic", "claude", 529, overloaded);
        assert_eq!(err.kind(), ProviderErrorKind::Overloaded);
        assert!(err.is_retryable());

        let credit = r#"{"type":"error","error":{"type":"invalid_request_error","message":"Your credit balance is too low"}}"#;
        assert_eq!(kind(400, credit), ProviderErrorKind::QuotaExceeded);

        let auth = r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        assert_eq!(kind(400, auth), ProviderErrorKind::InvalidKey);
    }

    #[test]
    fn groq_tool_use_failed_keeps_generation() {
        let body = r#"{"error":{"message":"Failed to call a function. Please adjust your prompt.","type":"invalid_request_error","code":"tool_use_failed","failed_generation":"<function=read_dir>{\"path\": \"~\"}</function>"}}"#;
        match classify("groq", "llama-3.3-70b", 400, body) {
            ProviderError::ToolCallMalformed {
                status_code,
                failed_generation,
            } => {
                assert_eq!(status_code, 400);
                assert!(failed_generation.unwrap().contains("read_dir"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn ollama_string_error() {
        let body = r#"{"error":"model 'llama9' not found, try pulling it first"}"#;
        match classify("ollama", "llama9", 404, body) {
            ProviderError::ModelNotFound { model } => assert_eq!(model, "llama9"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn context_too_long() {
        let body = r#"{"error":{"message":"This model's maximum context length is 128000 tokens","code":"context_length_exceeded"}}"#;
        assert_eq!(kind(400, body), ProviderErrorKind::ContextTooLong);
    }

    #[test]
    fn server_errors_are_generic_but_retryable() {
        let err = classify("openai", "m", 502, "<html>Bad Gateway</html>");
        assert_eq!(err.kind(), ProviderErrorKind::Generic);
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), Some(502));
    }

    #[test]
    fn client_errors_are_not_retryable() {
        let err = classify("openai", "m", 400, r#"{"error":{"message":"bad param"}}"#);
        assert!(!err.is_retryable());
        match err {
            ProviderError::Api { message, .. } => assert_eq!(message, "bad param"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn empty_body_gets_status_message() {
        match classify("openai", "m", 418, "") {
            ProviderError::Api { message, .. } => assert_eq!(message, "HTTP 418"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
