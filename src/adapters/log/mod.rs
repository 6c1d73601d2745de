//! Conversation log adapters.

mod jsonl;

pub use jsonl::{JsonlConversationLog, NullConversationLog};
