//! No-op memory store: disables long-term memory entirely.

use async_trait::async_trait;
use wayfarer_core::error::MemoryError;
use wayfarer_core::memory::MemoryStore;

/// A store that remembers nothing and finds nothing.
pub struct NoopStore;

#[async_trait]
impl MemoryStore for NoopStore {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<String>, MemoryError> {
        Ok(Vec::new())
    }

    async fn add(&self, _text: &str, _source: &str) -> Result<(), MemoryError> {
        Ok(())
    }
}
