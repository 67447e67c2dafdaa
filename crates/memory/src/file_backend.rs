//! File-based memory store: persistent JSON-lines storage.
//!
//! Each line is a JSON-encoded [`MemoryEntry`]. Entries are loaded once on
//! creation and the whole file is rewritten on every add, which is fine at
//! the scale of a personal preference log.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use wayfarer_core::error::MemoryError;
use wayfarer_core::memory::{MemoryEntry, MemoryStore};
use crate::in_memory::new_entry;
use crate::rank::rank;

/// A file-backed store using JSONL (one JSON object per line).
pub struct FileStore {
    path: PathBuf,
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
}

impl FileStore {
    /// Open the store at `path`.
    ///
    /// A missing file starts empty and is created on the first write;
    /// corrupted lines are skipped.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_from_disk(&path);
        debug!(path = %path.display(), count = entries.len(), "File memory store loaded");
        Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn flush(&self, entries: &[MemoryEntry]) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MemoryError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for entry in entries {
            let line = serde_json::to_string(entry).map_err(|e| {
                MemoryError::Storage(format!("Failed to serialize memory entry: {e}"))
            })?;
            content.push_str(&line);
            content.push('\n');
        }

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to write memory file: {e}")))
    }
}

fn load_from_disk(path: &Path) -> Vec<MemoryEntry> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<MemoryEntry>(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping corrupted memory entry");
                None
            }
        })
        .collect()
}

#[async_trait]
impl MemoryStore for FileStore {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, MemoryError> {
        let entries = self.entries.read().await;
        Ok(rank(&entries, query, limit))
    }

    async fn add(&self, text: &str, source: &str) -> Result<(), MemoryError> {
        let mut entries = self.entries.write().await;
        let Some(entry) = new_entry(&entries, text, source)? else {
            return Ok(());
        };
        entries.push(entry);
        if let Err(e) = self.flush(&entries).await {
            entries.pop();
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[tokio::test]
    async fn add_persists_across_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("memory.jsonl");

        let mem = FileStore::new(&path);
        mem.add("The user prefers Rust", "preference").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("The user prefers Rust"));

        let reloaded = FileStore::new(&path);
        assert_eq!(reloaded.len().await, 1);
        assert_eq!(reloaded.search("rust", 5).await.unwrap(), vec!["The user prefers Rust"]);
    }

    #[tokio::test]
    async fn handles_missing_file_gracefully() {
        let dir = TempDir::new().unwrap();
        let mem = FileStore::new(dir.path().join("absent.jsonl"));
        assert!(mem.is_empty().await);
        assert!(mem.search("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn handles_corrupted_lines() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, r#"{{"id":"1","content":"valid","source":"user","created_at":"2026-01-01T00:00:00Z"}}"#).unwrap();
        writeln!(tmp, "this is not json").unwrap();
        writeln!(tmp, r#"{{"id":"2","content":"also valid","source":"user","created_at":"2026-01-02T00:00:00Z"}}"#).unwrap();

        let mem = FileStore::new(tmp.path());
        assert_eq!(mem.len().await, 2);
    }

    #[tokio::test]
    async fn failed_write_leaves_store_unchanged() {
        let dir = TempDir::new().unwrap();
        // a directory where the file should be makes the write fail
        let path = dir.path().join("memory.jsonl");
        std::fs::create_dir(&path).unwrap();

        let mem = FileStore::new(&path);
        assert!(mem.add("lost", "user").await.is_err());
        assert!(mem.is_empty().await);
    }
}
