//! Draft Dispatcher Port - finalize-and-send for confirmed email drafts.

use async_trait::async_trait;
use thiserror::Error;

use super::GeneratorError;

/// Failures while dispatching a confirmed draft.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The underlying generation call failed.
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    /// The mail capability itself failed.
    #[error("mail service error: {0}")]
    MailService(String),
}

/// Port for the compose-and-send capability.
///
/// Consumes a finalize-and-send directive and returns the backend's textual
/// acknowledgement, which is surfaced to the user verbatim. There is no
/// typed delivery signal beyond that text, and the orchestrator never
/// retries a failed dispatch.
#[async_trait]
pub trait DraftDispatcher: Send + Sync {
    /// Executes the side effect described by the directive exactly once.
    async fn dispatch(&self, directive: &str) -> Result<String, DispatchError>;
}
