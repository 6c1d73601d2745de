//! JSONL conversation log.
//!
//! Appends one JSON line per event to `<logs_dir>/<session_id>.jsonl`.
//! Logging is best-effort: failures are traced and swallowed so a broken
//! disk never fails a chat turn.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::domain::foundation::SessionId;
use crate::ports::ConversationLog;

/// File-backed conversation log writing one JSONL file per session.
#[derive(Debug, Clone)]
pub struct JsonlConversationLog {
    logs_dir: PathBuf,
}

impl JsonlConversationLog {
    /// Creates a log rooted at the given directory.
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
        }
    }

    fn session_path(&self, session_id: SessionId) -> PathBuf {
        self.logs_dir.join(format!("{session_id}.jsonl"))
    }

    async fn append(&self, session_id: SessionId, entry: &Value) -> std::io::Result<()> {
        fs::create_dir_all(&self.logs_dir).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.session_path(session_id))
            .await?;
        let mut line = entry.to_string();
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

#[async_trait]
impl ConversationLog for JsonlConversationLog {
    async fn log_event(&self, session_id: SessionId, event: &str, payload: Value) {
        let entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "payload": payload,
        });
        if let Err(err) = self.append(session_id, &entry).await {
            tracing::warn!(%session_id, event, error = %err, "conversation log write failed");
        }
    }
}

/// Log adapter that discards every event. Used in tests and when the log
/// directory is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullConversationLog;

#[async_trait]
impl ConversationLog for NullConversationLog {
    async fn log_event(&self, _session_id: SessionId, _event: &str, _payload: Value) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_append_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlConversationLog::new(dir.path());
        let session = SessionId::new();

        log.log_event(session, "start_chat_request", json!({"user_id": "u1"}))
            .await;
        log.log_event(session, "start_chat_response", json!({"reply": "tamam"}))
            .await;

        let content = std::fs::read_to_string(dir.path().join(format!("{session}.jsonl"))).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "start_chat_request");
        assert_eq!(first["payload"]["user_id"], "u1");
        assert!(first["timestamp"].is_string());

        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event"], "start_chat_response");
    }

    #[tokio::test]
    async fn sessions_write_to_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlConversationLog::new(dir.path());
        let a = SessionId::new();
        let b = SessionId::new();

        log.log_event(a, "start_chat_request", json!({})).await;
        log.log_event(b, "start_chat_request", json!({})).await;

        assert!(dir.path().join(format!("{a}.jsonl")).exists());
        assert!(dir.path().join(format!("{b}.jsonl")).exists());
    }

    #[tokio::test]
    async fn write_failure_is_swallowed() {
        // Point the log at a path that cannot be a directory.
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let log = JsonlConversationLog::new(&blocker);
        // Must not panic or error.
        log.log_event(SessionId::new(), "event", json!({})).await;
    }
}
