//! HTTP adapters - axum surface over the application handlers.

pub mod chat;
