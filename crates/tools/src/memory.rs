//! Memory tools, backed by the configured [`MemoryStore`].

use serde_json::Value;
use wayfarer_core::error::ToolError;
use wayfarer_core::memory::MemoryStore;
use wayfarer_core::tool::ToolResult;
use crate::args::{optional_u64, required_str};

const DEFAULT_LIMIT: u64 = 5;
const MAX_LIMIT: u64 = 20;

/// Source tag for memories the model stores explicitly.
pub const AGENT_SOURCE: &str = "agent";

pub(crate) async fn memory_search(store: &dyn MemoryStore, args: &Value) -> Result<ToolResult, ToolError> {
    let query = required_str(args, "query")?;
    let limit = optional_u64(args, "limit").unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as usize;

    match store.search(query, limit).await {
        Ok(hits) if hits.is_empty() => Ok(ToolResult::ok("No matching memories.")),
        Ok(hits) => Ok(ToolResult::ok(
            hits.iter().map(|h| format!("- {h}")).collect::<Vec<_>>().join("\n"),
        )),
        Err(e) => Ok(ToolResult::failed(format!("Memory is unavailable: {e}"))),
    }
}

pub(crate) async fn memory_add(store: &dyn MemoryStore, args: &Value) -> Result<ToolResult, ToolError> {
    let text = required_str(args, "text")?;
    match store.add(text, AGENT_SOURCE).await {
        Ok(()) => Ok(ToolResult::ok(format!("Remembered: {}", text.trim()))),
        Err(e) => Ok(ToolResult::failed(format!("Could not store memory: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wayfarer_memory::{InMemoryStore, NoopStore};

    #[tokio::test]
    async fn add_then_search() {
        let store = InMemoryStore::new();
        let added = memory_add(&store, &json!({"text": "Project lives in ~/code/site"})).await.unwrap();
        assert!(added.success);
        assert_eq!(store.entries().await[0].source, AGENT_SOURCE);

        let found = memory_search(&store, &json!({"query": "project"})).await.unwrap();
        assert_eq!(found.output, "- Project lives in ~/code/site");
    }

    #[tokio::test]
    async fn nothing_found() {
        let found = memory_search(&NoopStore, &json!({"query": "anything"})).await.unwrap();
        assert!(found.success);
        assert_eq!(found.output, "No matching memories.");
    }
}
