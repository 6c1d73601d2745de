//! Conversation Log Port - per-session audit trail of chat events.
//!
//! Best-effort: logging failures must never fail the turn that produced
//! the event, so the port is infallible and adapters swallow-and-trace
//! their own errors.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::foundation::SessionId;

/// Port for the session event log.
#[async_trait]
pub trait ConversationLog: Send + Sync {
    /// Records one event with an arbitrary JSON payload.
    async fn log_event(&self, session_id: SessionId, event: &str, payload: Value);
}
