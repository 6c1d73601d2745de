//! Chat Handler Port - the reply-generator capability of a domain agent.
//!
//! A handler turns a user message into a reply, either as a complete typed
//! result or as an incremental token sequence. The streamed form carries no
//! typed draft; intent arrives only through the trailing marker block, which
//! the orchestrator decodes after the stream ends.
//!
//! Deadlines are enforced by the orchestrator, not by implementations.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

use crate::domain::chat::Reply;
use crate::domain::foundation::{SessionId, UserId};

/// A single handler invocation.
#[derive(Debug, Clone)]
pub struct HandlerCall {
    /// The raw user message for this turn.
    pub message: String,
    /// The user driving the session.
    pub user_id: UserId,
    /// The session the turn belongs to.
    pub session_id: SessionId,
}

impl HandlerCall {
    /// Creates a handler call.
    pub fn new(message: impl Into<String>, user_id: UserId, session_id: SessionId) -> Self {
        Self {
            message: message.into(),
            user_id,
            session_id,
        }
    }
}

/// An incremental piece of streamed reply text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenChunk {
    /// New content in this chunk.
    pub delta: String,
}

impl TokenChunk {
    /// Creates a content chunk.
    pub fn new(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
        }
    }
}

/// A pinned, boxed stream of token chunks.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<TokenChunk, GeneratorError>> + Send>>;

/// Failures surfaced by generation collaborators.
///
/// The orchestrator maps every variant to a user-safe `ModelUnavailable`
/// condition; the detail here is for diagnostics only.
#[derive(Debug, Clone, Error)]
pub enum GeneratorError {
    /// The call exceeded its deadline and was cancelled.
    #[error("generation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The backing model rejected or failed the request.
    #[error("model provider error: {0}")]
    Provider(String),

    /// The response could not be understood.
    #[error("response parse error: {0}")]
    Parse(String),

    /// Network failure reaching the backend.
    #[error("network error: {0}")]
    Network(String),
}

/// Port for a domain handler capability.
#[async_trait]
pub trait ChatHandler: Send + Sync {
    /// Generates a complete reply for one turn.
    async fn complete(&self, call: HandlerCall) -> Result<Reply, GeneratorError>;

    /// Generates a streaming reply for one turn.
    ///
    /// The concatenated chunks, once marker-decoded, must yield the same
    /// shape `complete` would have returned.
    async fn stream(&self, call: HandlerCall) -> Result<TokenStream, GeneratorError>;
}
