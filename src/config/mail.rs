//! Mail identity configuration

use serde::Deserialize;

/// Sender identity and default recipient for dispatched drafts.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Sender display name
    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    /// Sender email address
    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    /// Fallback recipient when the draft has no recipient hint
    #[serde(default = "default_recipient")]
    pub default_recipient: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender_name: default_sender_name(),
            sender_email: default_sender_email(),
            default_recipient: default_recipient(),
        }
    }
}

fn default_sender_name() -> String {
    "Chatbot".to_string()
}

fn default_sender_email() -> String {
    "no-reply@example.com".to_string()
}

fn default_recipient() -> String {
    "satinalma@example.com".to_string()
}
