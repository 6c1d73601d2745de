//! Request and response DTOs for the chat endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::chat::EmailInfo;

const MESSAGE_MAX_LEN: usize = 10_000;

/// Request to start a new chat session.
#[derive(Debug, Clone, Deserialize)]
pub struct StartChatRequest {
    pub user_id: String,
    pub message: String,
    #[serde(default)]
    pub stream: bool,
}

/// Response for a started session (non-streaming).
#[derive(Debug, Clone, Serialize)]
pub struct StartChatResponse {
    pub session_id: String,
    pub assigned_handler_id: String,
    pub assigned_handler_name: String,
    pub routing_reason: String,
    pub reply: String,
    pub latency_seconds: f64,
}

/// Request for one turn in an existing session.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageRequest {
    pub user_id: String,
    pub session_id: String,
    pub message: String,
    #[serde(default)]
    pub stream: bool,
}

/// Response for one turn (non-streaming).
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessageResponse {
    pub reply: String,
    pub email_triggered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_info: Option<EmailInfo>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub available_handlers: Vec<String>,
}

/// User-safe error body. Internal detail never travels here.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Validates the free-text message bounds shared by both endpoints.
pub fn validate_message(message: &str) -> Result<(), String> {
    if message.trim().is_empty() {
        return Err("message cannot be empty".to_string());
    }
    if message.chars().count() > MESSAGE_MAX_LEN {
        return Err(format!("message exceeds {MESSAGE_MAX_LEN} characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_flag_defaults_to_false() {
        let req: StartChatRequest =
            serde_json::from_str(r#"{"user_id": "u1", "message": "merhaba"}"#).unwrap();
        assert!(!req.stream);
    }

    #[test]
    fn message_bounds_are_enforced() {
        assert!(validate_message("merhaba").is_ok());
        assert!(validate_message("   ").is_err());
        assert!(validate_message(&"x".repeat(10_001)).is_err());
        assert!(validate_message(&"x".repeat(10_000)).is_ok());
    }

    #[test]
    fn email_info_is_omitted_when_absent() {
        let response = ChatMessageResponse {
            reply: "tamam".to_string(),
            email_triggered: false,
            email_info: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("email_info").is_none());
    }
}
