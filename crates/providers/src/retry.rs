//! Bounded retry with exponential backoff.
//!
//! Only errors that report themselves retryable (rate limits, overload,
//! 5xx) are retried. Everything else is returned on first failure.

use std::time::Duration;
use tracing::warn;
use wayfarer_core::{Provider, ProviderError, ProviderRequest, ProviderResponse};

/// How many times, and how long, to back off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// First delay after a rate-limit error
    pub rate_limit_delay: Duration,

    /// First delay after any other retryable error
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            rate_limit_delay: Duration::from_secs(5),
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based), doubling each time.
    pub fn delay_for(&self, error: &ProviderError, attempt: u32) -> Duration {
        let base = if error.is_rate_limit() {
            self.rate_limit_delay
        } else {
            self.base_delay
        };
        base * 2u32.saturating_pow(attempt)
    }
}

/// Call `provider.complete`, retrying retryable failures per `policy`.
pub async fn complete_with_retry(
    provider: &dyn Provider,
    request: ProviderRequest,
    policy: &RetryPolicy,
) -> Result<ProviderResponse, ProviderError> {
    let mut attempt = 0;
    loop {
        match provider.complete(request.clone()).await {
            Ok(response) => return Ok(response),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay_for(&e, attempt);
                warn!(
                    provider = provider.name(),
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retryable provider error, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use wayfarer_core::{Message, ProviderKind};

    /// Replays a fixed list of outcomes, one per call.
    struct Scripted {
        outcomes: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(mut outcomes: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
            outcomes.reverse();
            Self {
                outcomes: Mutex::new(outcomes),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Provider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::OpenAiCompatible
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ProviderError::InvalidResponse("script exhausted".into())))
        }
    }

    fn rate_limited() -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::RateLimited {
            provider: "scripted".into(),
        })
    }

    fn request() -> ProviderRequest {
        ProviderRequest::new("m", vec![Message::user("hi")])
    }

    #[test]
    fn delays_double() {
        let policy = RetryPolicy::default();
        let rate = ProviderError::RateLimited { provider: "p".into() };
        let server = ProviderError::Api {
            status_code: 503,
            message: "unavailable".into(),
        };
        assert_eq!(policy.delay_for(&rate, 0), Duration::from_secs(5));
        assert_eq!(policy.delay_for(&rate, 1), Duration::from_secs(10));
        assert_eq!(policy.delay_for(&server, 0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(&server, 1), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn two_rate_limits_then_success() {
        let provider = Scripted::new(vec![
            rate_limited(),
            rate_limited(),
            Ok(ProviderResponse::text("m", "finally")),
        ]);
        let started = tokio::time::Instant::now();

        let response = complete_with_retry(&provider, request(), &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(response.text.as_deref(), Some("finally"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        // 5s + 10s of backoff
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_are_bounded() {
        let provider = Scripted::new(vec![rate_limited(), rate_limited(), rate_limited(), rate_limited()]);
        let err = complete_with_retry(&provider, request(), &RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(err.is_rate_limit());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_fails_immediately() {
        let invalid = || {
            Err(ProviderError::InvalidKey {
                provider: "scripted".into(),
            })
        };
        let provider = Scripted::new(vec![invalid(), invalid(), invalid()]);
        let started = tokio::time::Instant::now();

        let err = complete_with_retry(&provider, request(), &RetryPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::InvalidKey { .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn network_errors_are_not_retried() {
        let provider = Scripted::new(vec![Err(ProviderError::Network("connection refused".into()))]);
        let err = complete_with_retry(&provider, request(), &RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
