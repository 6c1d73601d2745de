//! In-memory pending-action store.
//!
//! The only shared mutable state in the process. Each operation takes the
//! lock for a single map access and releases it before returning; the lock
//! is never held across a generation call.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::chat::PendingAction;
use crate::domain::foundation::SessionId;
use crate::ports::PendingActionStore;

/// In-memory store mapping a session to at most one pending action.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPendingStore {
    actions: Arc<RwLock<HashMap<SessionId, PendingAction>>>,
}

impl InMemoryPendingStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with a pending action.
    pub async fn len(&self) -> usize {
        self.actions.read().await.len()
    }

    /// Returns true when no session has a pending action.
    pub async fn is_empty(&self) -> bool {
        self.actions.read().await.is_empty()
    }
}

#[async_trait]
impl PendingActionStore for InMemoryPendingStore {
    async fn put(&self, session_id: SessionId, action: PendingAction) {
        self.actions.write().await.insert(session_id, action);
    }

    async fn peek(&self, session_id: SessionId) -> Option<PendingAction> {
        self.actions.read().await.get(&session_id).cloned()
    }

    async fn take(&self, session_id: SessionId) -> Option<PendingAction> {
        self.actions.write().await.remove(&session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::DraftSuggestion;

    fn sample_action(reply: &str) -> PendingAction {
        PendingAction::new(
            DraftSuggestion {
                reply: reply.to_string(),
                email_intent: true,
                ..Default::default()
            },
            "kaynak mesaj",
        )
    }

    #[tokio::test]
    async fn peek_leaves_action_in_place() {
        let store = InMemoryPendingStore::new();
        let session = SessionId::new();
        store.put(session, sample_action("taslak")).await;

        assert!(store.peek(session).await.is_some());
        assert!(store.peek(session).await.is_some());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn take_removes_atomically() {
        let store = InMemoryPendingStore::new();
        let session = SessionId::new();
        store.put(session, sample_action("taslak")).await;

        let taken = store.take(session).await;
        assert_eq!(taken.unwrap().rendered_reply, "taslak");
        assert!(store.take(session).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn put_replaces_existing_action() {
        let store = InMemoryPendingStore::new();
        let session = SessionId::new();
        store.put(session, sample_action("eski")).await;
        store.put(session, sample_action("yeni")).await;

        assert_eq!(store.peek(session).await.unwrap().rendered_reply, "yeni");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let store = InMemoryPendingStore::new();
        let a = SessionId::new();
        let b = SessionId::new();
        store.put(a, sample_action("a")).await;
        store.put(b, sample_action("b")).await;

        store.take(a).await;
        assert!(store.peek(a).await.is_none());
        assert_eq!(store.peek(b).await.unwrap().rendered_reply, "b");
    }

    #[tokio::test]
    async fn concurrent_takes_yield_one_winner() {
        let store = Arc::new(InMemoryPendingStore::new());
        let session = SessionId::new();
        store.put(session, sample_action("tek")).await;

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.take(session).await })
            })
            .collect();

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
