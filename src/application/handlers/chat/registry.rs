//! Static registry of domain handlers.
//!
//! Built once at startup; the orchestrator validates every routing
//! decision and every continue-turn address against it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::foundation::HandlerId;
use crate::ports::ChatHandler;

/// A registered domain handler with its user-facing display name.
#[derive(Clone)]
pub struct RegisteredHandler {
    /// Name shown to users (e.g. "Satınalma Asistanı").
    pub display_name: String,
    /// The handler capability.
    pub handler: Arc<dyn ChatHandler>,
}

/// Immutable mapping from handler id to handler capability.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<HandlerId, RegisteredHandler>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler under the given id. Builder-style for startup wiring.
    pub fn register(
        mut self,
        id: HandlerId,
        display_name: impl Into<String>,
        handler: Arc<dyn ChatHandler>,
    ) -> Self {
        self.handlers.insert(
            id,
            RegisteredHandler {
                display_name: display_name.into(),
                handler,
            },
        );
        self
    }

    /// Looks up a handler by id.
    pub fn get(&self, id: &HandlerId) -> Option<&RegisteredHandler> {
        self.handlers.get(id)
    }

    /// Returns true when the id is registered.
    pub fn contains(&self, id: &HandlerId) -> bool {
        self.handlers.contains_key(id)
    }

    /// Returns all registered handler ids.
    pub fn ids(&self) -> Vec<HandlerId> {
        self.handlers.keys().cloned().collect()
    }

    /// Returns the display name for an id, falling back to the raw id.
    pub fn display_name(&self, id: &HandlerId) -> String {
        self.handlers
            .get(id)
            .map(|h| h.display_name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}
