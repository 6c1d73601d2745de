//! Conversation log configuration

use serde::Deserialize;

/// Where per-session JSONL conversation logs are written.
#[derive(Debug, Clone, Deserialize)]
pub struct LogsConfig {
    /// Directory for conversation log files
    #[serde(default = "default_conversation_dir")]
    pub conversation_dir: String,

    /// Disable conversation logging entirely
    #[serde(default)]
    pub disabled: bool,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            conversation_dir: default_conversation_dir(),
            disabled: false,
        }
    }
}

fn default_conversation_dir() -> String {
    "data/conversations".to_string()
}
