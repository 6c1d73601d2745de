//! Command handlers, grouped by capability area.

pub mod chat;
