//! Memory trait: the long-term memory collaborator.
//!
//! The agent uses it to pull context into the system prompt and to store
//! learned preferences. Failures here must never abort a request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::MemoryError;

/// A single stored memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique ID for this memory
    pub id: String,

    /// The content of the memory
    pub content: String,

    /// Where the memory came from ("preference", "tool", "user", ...)
    pub source: String,

    /// When this memory was created
    pub created_at: DateTime<Utc>,
}

/// The memory collaborator contract.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Return up to `limit` snippets relevant to `query`, best first.
    async fn search(&self, query: &str, limit: usize) -> std::result::Result<Vec<String>, MemoryError>;

    /// Store a new memory.
    async fn add(&self, text: &str, source: &str) -> std::result::Result<(), MemoryError>;
}
