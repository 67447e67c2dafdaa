//! Confirmation of dangerous tool calls.
//!
//! The loop asks a [`Confirmer`] and waits for a yes or no. The UI layer
//! decides how the question reaches the user.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// What the user is being asked to approve.
#[derive(Debug, Clone)]
pub struct ConfirmationRequest {
    pub request_id: String,
    pub tool_call_id: String,
    pub tool_name: String,
    /// Human-readable description of the action
    pub message: String,
    pub arguments: Value,
}

#[async_trait]
pub trait Confirmer: Send + Sync {
    /// Resolve to `true` to run the call, `false` to skip it.
    async fn confirm(&self, request: ConfirmationRequest) -> bool;
}

/// Approves everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

#[async_trait]
impl Confirmer for AutoApprove {
    async fn confirm(&self, _request: ConfirmationRequest) -> bool {
        true
    }
}

/// Denies everything. Used when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoDeny;

#[async_trait]
impl Confirmer for AutoDeny {
    async fn confirm(&self, _request: ConfirmationRequest) -> bool {
        false
    }
}

/// A confirmation waiting on the UI.
#[derive(Debug)]
pub struct PendingConfirmation {
    pub request: ConfirmationRequest,
    reply: oneshot::Sender<bool>,
}

impl PendingConfirmation {
    pub fn approve(self) {
        self.resolve(true);
    }

    pub fn deny(self) {
        self.resolve(false);
    }

    pub fn resolve(self, approved: bool) {
        if self.reply.send(approved).is_err() {
            debug!(tool_call_id = %self.request.tool_call_id, "Confirmation answered after the loop moved on");
        }
    }
}

/// Forwards each question over an mpsc channel.
///
/// Dropping a [`PendingConfirmation`] unanswered, or dropping the
/// receiver, counts as a denial.
#[derive(Debug, Clone)]
pub struct ChannelConfirmer {
    tx: mpsc::Sender<PendingConfirmation>,
}

impl ChannelConfirmer {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<PendingConfirmation>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Confirmer for ChannelConfirmer {
    async fn confirm(&self, request: ConfirmationRequest) -> bool {
        let (reply, answer) = oneshot::channel();
        if self.tx.send(PendingConfirmation { request, reply }).await.is_err() {
            return false;
        }
        answer.await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> ConfirmationRequest {
        ConfirmationRequest {
            request_id: "req-1".into(),
            tool_call_id: "call_1".into(),
            tool_name: "delete_path".into(),
            message: "Delete ~/old".into(),
            arguments: json!({"path": "~/old"}),
        }
    }

    #[tokio::test]
    async fn fixed_confirmers() {
        assert!(AutoApprove.confirm(request()).await);
        assert!(!AutoDeny.confirm(request()).await);
    }

    #[tokio::test]
    async fn channel_round_trip() {
        let (confirmer, mut rx) = ChannelConfirmer::new(1);
        let ui = tokio::spawn(async move {
            let pending = rx.recv().await.unwrap();
            assert_eq!(pending.request.tool_name, "delete_path");
            pending.approve();
        });
        assert!(confirmer.confirm(request()).await);
        ui.await.unwrap();
    }

    #[tokio::test]
    async fn dropped_reply_is_a_denial() {
        let (confirmer, mut rx) = ChannelConfirmer::new(1);
        let ui = tokio::spawn(async move {
            drop(rx.recv().await.unwrap());
        });
        assert!(!confirmer.confirm(request()).await);
        ui.await.unwrap();
    }

    #[tokio::test]
    async fn closed_channel_is_a_denial() {
        let (confirmer, rx) = ChannelConfirmer::new(1);
        drop(rx);
        assert!(!confirmer.confirm(request()).await);
    }
}
