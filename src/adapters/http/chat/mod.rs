//! Chat HTTP endpoints.

pub mod dto;
pub mod handlers;
pub mod routes;
mod sse;

pub use handlers::ChatAppState;
pub use routes::chat_routes;
