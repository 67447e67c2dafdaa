//! LLM provider implementations for Wayfarer.
//!
//! All providers implement the `wayfarer_core::Provider` trait.
//! The router selects the correct provider based on configuration.

pub mod anthropic;
pub mod classify;
mod http;
pub mod ollama;
pub mod openai_compat;
pub mod recovery;
pub mod retry;
pub mod router;
pub mod stream;

pub use anthropic::AnthropicProvider;
pub use classify::classify;
pub use http::DEFAULT_TIMEOUT;
pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use retry::{RetryPolicy, complete_with_retry};
pub use router::{best_route, build_provider, default_model};
pub use stream::{ndjson_stream, sse_stream};
