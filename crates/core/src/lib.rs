//! # Wayfarer Core
//!
//! Domain types, traits, and error definitions for the Wayfarer agent runtime.
//! This crate has **no HTTP or runtime dependencies** beyond tokio's sync
//! primitives: it defines the domain model that all other crates implement
//! against.
//!
//! ## Design Philosophy
//!
//! Every collaborator is defined as a trait here (provider, tool executor,
//! memory store, event sink). Implementations live in their respective
//! crates, so tests can swap in scripted stand-ins.

pub mod agent;
pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod provider;
pub mod schema;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AccessLevel, AgentLoopResult, LoopStatus};
pub use error::{Error, MemoryError, ProviderError, ProviderErrorKind, Result, ToolError};
pub use event::{AgentEvent, AgentEventKind, EventSink, NullSink};
pub use memory::{MemoryEntry, MemoryStore};
pub use message::{Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{ModelRoute, Provider, ProviderKind, ProviderRequest, ProviderResponse, TextStream, Usage};
pub use schema::SchemaFlavor;
pub use tool::{ParamType, ToolCall, ToolCategory, ToolDefinition, ToolExecutor, ToolParam, ToolResult};
