//! Agent access levels and loop outcome types.

use serde::{Deserialize, Serialize};

/// How much freedom the agent has to act.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// No dangerous tools and nothing that runs code
    Safe,
    /// Everything is offered; dangerous calls need confirmation (default)
    #[default]
    Power,
    /// Everything is offered and nothing is gated
    Ultimate,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Power => "power",
            Self::Ultimate => "ultimate",
        }
    }

    pub fn is_max(&self) -> bool {
        matches!(self, Self::Ultimate)
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(Self::Safe),
            "power" => Ok(Self::Power),
            "ultimate" => Ok(Self::Ultimate),
            other => Err(format!("unknown access level '{other}'")),
        }
    }
}

/// How an agent loop invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopStatus {
    Done,
    Error,
    Cancelled,
}

/// Terminal summary of one loop invocation. Produced exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLoopResult {
    pub status: LoopStatus,

    /// Completed model turns
    pub steps: u32,

    /// User-safe error text when `status` is `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// The final answer when `status` is `done`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl AgentLoopResult {
    pub fn done(steps: u32, answer: impl Into<String>) -> Self {
        Self {
            status: LoopStatus::Done,
            steps,
            error: None,
            answer: Some(answer.into()),
        }
    }

    pub fn error(steps: u32, message: impl Into<String>) -> Self {
        Self {
            status: LoopStatus::Error,
            steps,
            error: Some(message.into()),
            answer: None,
        }
    }

    pub fn cancelled(steps: u32) -> Self {
        Self {
            status: LoopStatus::Cancelled,
            steps,
            error: None,
            answer: None,
        }
    }
}
