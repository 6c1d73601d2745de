//! Routing Oracle Port - first-turn handler selection.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::chat::RoutingDecision;
use crate::domain::foundation::UserId;

use super::GeneratorError;

/// Failures while producing a routing decision.
#[derive(Debug, Clone, Error)]
pub enum RoutingError {
    /// The oracle's answer could not be understood.
    #[error("routing response could not be parsed: {0}")]
    Unparseable(String),

    /// The underlying generation call failed.
    #[error(transparent)]
    Generator(#[from] GeneratorError),
}

/// Port for the routing classifier oracle.
///
/// Consumes the raw first message and returns the handler that should own
/// the session. Validation against the handler registry is the
/// orchestrator's job, not the oracle's.
#[async_trait]
pub trait RoutingOracle: Send + Sync {
    /// Decides which handler should answer this user's first message.
    async fn route(&self, user_id: &UserId, message: &str)
        -> Result<RoutingDecision, RoutingError>;
}
