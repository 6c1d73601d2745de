//! Reply shapes produced by domain handlers.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::HandlerId;

/// Routing decision produced once per session by the routing oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// The handler that should own the session.
    pub handler_id: HandlerId,
    /// Short explanation of why this handler was chosen.
    pub reason: String,
}

/// Structured handler output carrying an optional email draft.
///
/// Both the typed handler path and the streamed trailing-marker path
/// deserialize into this shape; the orchestrator treats them identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSuggestion {
    /// The reply text shown to the user.
    #[serde(default)]
    pub reply: String,
    /// Whether the user asked for an email to be sent this turn.
    #[serde(default)]
    pub email_intent: bool,
    /// Best guess at who the email should go to.
    #[serde(default)]
    pub email_recipient_hint: Option<String>,
    /// Suggested subject line.
    #[serde(default)]
    pub email_subject_suggestion: Option<String>,
    /// Suggested body text.
    #[serde(default)]
    pub email_body_suggestion: Option<String>,
}

/// Normalized handler result: either a structured draft suggestion or
/// plain text. The only shape the orchestrator ever inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Structured(DraftSuggestion),
    Plain(String),
}

impl Reply {
    /// Returns the user-visible reply text.
    pub fn text(&self) -> &str {
        match self {
            Reply::Structured(draft) => &draft.reply,
            Reply::Plain(text) => text,
        }
    }

    /// Returns the draft suggestion when the handler signalled email intent.
    pub fn email_draft(&self) -> Option<&DraftSuggestion> {
        match self {
            Reply::Structured(draft) if draft.email_intent => Some(draft),
            _ => None,
        }
    }
}

/// An unconfirmed email draft awaiting explicit user confirmation.
///
/// At most one exists per session. Any turn that is not a confirm or
/// cancel for this draft discards it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    /// The structured draft produced by the handler.
    pub draft: DraftSuggestion,
    /// The reply text that was rendered to the user with the draft.
    pub rendered_reply: String,
    /// The user message that triggered the draft.
    pub originating_message: String,
}

impl PendingAction {
    /// Creates a pending action from a draft and its originating turn.
    pub fn new(draft: DraftSuggestion, originating_message: impl Into<String>) -> Self {
        let rendered_reply = draft.reply.clone();
        Self {
            draft,
            rendered_reply,
            originating_message: originating_message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_reply_has_no_draft() {
        let reply = Reply::Plain("merhaba".to_string());
        assert_eq!(reply.text(), "merhaba");
        assert!(reply.email_draft().is_none());
    }

    #[test]
    fn structured_reply_without_intent_has_no_draft() {
        let reply = Reply::Structured(DraftSuggestion {
            reply: "cevap".to_string(),
            email_intent: false,
            ..Default::default()
        });
        assert!(reply.email_draft().is_none());
    }

    #[test]
    fn structured_reply_with_intent_exposes_draft() {
        let reply = Reply::Structured(DraftSuggestion {
            reply: "taslak hazır".to_string(),
            email_intent: true,
            email_recipient_hint: Some("satinalma".to_string()),
            ..Default::default()
        });
        let draft = reply.email_draft().unwrap();
        assert_eq!(draft.email_recipient_hint.as_deref(), Some("satinalma"));
    }

    #[test]
    fn pending_action_captures_rendered_reply() {
        let draft = DraftSuggestion {
            reply: "taslak".to_string(),
            email_intent: true,
            ..Default::default()
        };
        let pending = PendingAction::new(draft, "5 sandalye lazım");
        assert_eq!(pending.rendered_reply, "taslak");
        assert_eq!(pending.originating_message, "5 sandalye lazım");
    }

    #[test]
    fn draft_suggestion_deserializes_with_missing_fields() {
        let draft: DraftSuggestion =
            serde_json::from_str(r#"{"email_intent": true}"#).unwrap();
        assert!(draft.email_intent);
        assert_eq!(draft.reply, "");
        assert!(draft.email_recipient_hint.is_none());
    }
}
