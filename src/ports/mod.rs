//! Ports - interfaces to external collaborators.
//!
//! Each port is an `async_trait` consumed by the application layer and
//! implemented by an adapter. The orchestrator never touches a concrete
//! backend directly.

mod chat_handler;
mod conversation_log;
mod draft_dispatcher;
mod pending_store;
mod routing_oracle;

pub use chat_handler::{ChatHandler, GeneratorError, HandlerCall, TokenChunk, TokenStream};
pub use conversation_log::ConversationLog;
pub use draft_dispatcher::{DispatchError, DraftDispatcher};
pub use pending_store::PendingActionStore;
pub use routing_oracle::{RoutingError, RoutingOracle};
