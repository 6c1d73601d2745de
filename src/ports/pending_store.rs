//! Pending Action Store Port.
//!
//! Process-wide mapping from session to at most one pending email draft.
//! Operations are atomic per key; implementations must not hold their lock
//! across anything but the map operation itself.

use async_trait::async_trait;

use crate::domain::chat::PendingAction;
use crate::domain::foundation::SessionId;

/// Port for the pending-action store.
#[async_trait]
pub trait PendingActionStore: Send + Sync {
    /// Inserts or replaces the pending action for a session.
    async fn put(&self, session_id: SessionId, action: PendingAction);

    /// Returns a copy of the pending action, leaving it in place.
    async fn peek(&self, session_id: SessionId) -> Option<PendingAction>;

    /// Removes and returns the pending action in one atomic step.
    async fn take(&self, session_id: SessionId) -> Option<PendingAction>;
}
