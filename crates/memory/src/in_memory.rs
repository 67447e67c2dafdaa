//! In-memory store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use wayfarer_core::error::MemoryError;
use wayfarer_core::memory::{MemoryEntry, MemoryStore};
use crate::rank::rank;

/// A store that keeps memories in a `Vec` for the life of the process.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything stored, oldest first.
    pub async fn entries(&self) -> Vec<MemoryEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Build an entry for `text`, or `None` when it is blank or already stored.
pub(crate) fn new_entry(existing: &[MemoryEntry], text: &str, source: &str) -> Result<Option<MemoryEntry>, MemoryError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(MemoryError::Storage("refusing to store an empty memory".into()));
    }
    if existing.iter().any(|e| e.content.eq_ignore_ascii_case(text)) {
        return Ok(None);
    }
    Ok(Some(MemoryEntry {
        id: Uuid::new_v4().to_string(),
        content: text.to_string(),
        source: source.to_string(),
        created_at: Utc::now(),
    }))
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, MemoryError> {
        let entries = self.entries.read().await;
        Ok(rank(&entries, query, limit))
    }

    async fn add(&self, text: &str, source: &str) -> Result<(), MemoryError> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = new_entry(&entries, text, source)? {
            entries.push(entry);
        }
        Ok(())
    }
}
