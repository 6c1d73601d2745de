//! Generation adapters - backends for the routing, handler and dispatch
//! ports.

mod gemini;
mod mock;

pub use gemini::{GeminiClient, GeminiDispatcher, GeminiHandler, GeminiRoutingOracle};
pub use mock::{MockChatHandler, MockDraftDispatcher, MockRoutingOracle};
