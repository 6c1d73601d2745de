//! Chat domain: replies, drafts, confirmation classification and the
//! trailing-marker decoder.

pub mod confirmation;
pub mod marker;
pub mod prompts;
mod reply;

pub use confirmation::{classify_confirmation, ConfirmationSignal};
pub use marker::{decode_marker, MarkerOutcome};
pub use reply::{DraftSuggestion, PendingAction, Reply, RoutingDecision};
