//! Agent events: the one-way progress channel to the UI layer.
//!
//! Every event carries the request ID it belongs to. Ordering within one
//! request is significant:
//! `status → tool_call → [confirm_needed] → tool_result → … → done | error`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A single progress event. Write-once; never mutated after emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEvent {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: AgentEventKind,
}

impl AgentEvent {
    pub fn new(request_id: impl Into<String>, kind: AgentEventKind) -> Self {
        Self {
            request_id: request_id.into(),
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Wire name of this event's type.
    pub fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }
}

/// The event payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AgentEventKind {
    /// The loop is starting a step.
    Status { step: u32, message: String },

    /// Free text the model produced alongside tool calls.
    Thinking { content: String },

    /// The agent is about to invoke a tool.
    ToolCall {
        id: String,
        name: String,
        arguments: serde_json::Value,
        dangerous: bool,
    },

    /// The agent is waiting for the user to approve a dangerous call.
    ConfirmNeeded {
        id: String,
        name: String,
        message: String,
    },

    /// A tool finished (or was denied).
    ToolResult {
        id: String,
        name: String,
        success: bool,
        output: String,
        duration_ms: u64,
    },

    /// The final answer text.
    TextChunk { content: String },

    /// The loop finished with an answer.
    Done { steps: u32 },

    /// The loop gave up.
    Error { message: String },
}

impl AgentEventKind {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Thinking { .. } => "thinking",
            Self::ToolCall { .. } => "tool_call",
            Self::ConfirmNeeded { .. } => "confirm_needed",
            Self::ToolResult { .. } => "tool_result",
            Self::TextChunk { .. } => "text_chunk",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}

/// Where agent events go.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AgentEvent);
}

impl EventSink for mpsc::UnboundedSender<AgentEvent> {
    fn emit(&self, event: AgentEvent) {
        // A closed receiver means nobody is watching; that's fine
        let _ = self.send(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: AgentEvent) {}
}
