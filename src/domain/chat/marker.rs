//! Trailing-marker decoder for streamed replies.
//!
//! Streamed handlers cannot return typed drafts, so they append a
//! delimited JSON block after the visible text:
//!
//! ```text
//! <visible reply>
//! ---JSON---
//! {"email_intent": true, "email_recipient_hint": "..."}
//! ---END---
//! ```
//!
//! Decoding runs exactly once, on the fully-accumulated text after the
//! stream has terminated. Scanning per-chunk would truncate a delimiter
//! that straddles two chunks.

use serde_json::Value;

use super::reply::DraftSuggestion;

/// Start delimiter of the trailing marker block.
pub const MARKER_START: &str = "---JSON---";
/// End delimiter of the trailing marker block.
pub const MARKER_END: &str = "---END---";

/// Result of decoding accumulated stream text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerOutcome {
    /// The user-visible reply text, with any marker block stripped.
    pub visible_reply: String,
    /// The decoded draft, present only when the marker parsed and
    /// carried `email_intent = true`.
    pub draft: Option<DraftSuggestion>,
}

/// Decodes the trailing marker block from fully-accumulated stream text.
///
/// Tolerant by contract: a missing delimiter or malformed JSON yields the
/// raw text with no draft, never an error.
pub fn decode_marker(accumulated: &str) -> MarkerOutcome {
    let raw = MarkerOutcome {
        visible_reply: accumulated.to_string(),
        draft: None,
    };

    let Some(start) = accumulated.find(MARKER_START) else {
        return raw;
    };
    let after_start = start + MARKER_START.len();
    let Some(end_rel) = accumulated[after_start..].find(MARKER_END) else {
        return raw;
    };

    let payload = accumulated[after_start..after_start + end_rel].trim();
    let Ok(value) = serde_json::from_str::<Value>(payload) else {
        return raw;
    };
    let email_intent = value
        .get("email_intent")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !email_intent {
        return raw;
    }

    let visible_reply = accumulated[..start].trim().to_string();
    let mut draft: DraftSuggestion = serde_json::from_value(value).unwrap_or_default();
    draft.email_intent = true;
    if draft.reply.is_empty() {
        draft.reply = visible_reply.clone();
    }

    MarkerOutcome {
        visible_reply,
        draft: Some(draft),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_delimiters_yields_no_draft() {
        let outcome = decode_marker("sadece düz metin");
        assert_eq!(outcome.visible_reply, "sadece düz metin");
        assert!(outcome.draft.is_none());
    }

    #[test]
    fn missing_end_delimiter_yields_no_draft() {
        let text = "cevap\n---JSON---\n{\"email_intent\": true}";
        let outcome = decode_marker(text);
        assert_eq!(outcome.visible_reply, text);
        assert!(outcome.draft.is_none());
    }

    #[test]
    fn malformed_json_yields_no_draft() {
        let text = "cevap\n---JSON---\n{oops\n---END---";
        let outcome = decode_marker(text);
        assert_eq!(outcome.visible_reply, text);
        assert!(outcome.draft.is_none());
    }

    #[test]
    fn intent_false_keeps_raw_text() {
        let text = "cevap\n---JSON---\n{\"email_intent\": false}\n---END---";
        let outcome = decode_marker(text);
        assert_eq!(outcome.visible_reply, text);
        assert!(outcome.draft.is_none());
    }

    #[test]
    fn well_formed_marker_is_extracted() {
        let text = concat!(
            "Taslak hazır, onay bekliyorum.\n",
            "---JSON---\n",
            r#"{"email_intent": true, "email_recipient_hint": "satinalma", "email_subject_suggestion": "Sandalye Talebi"}"#,
            "\n---END---"
        );
        let outcome = decode_marker(text);
        assert_eq!(outcome.visible_reply, "Taslak hazır, onay bekliyorum.");
        let draft = outcome.draft.unwrap();
        assert!(draft.email_intent);
        assert_eq!(draft.email_recipient_hint.as_deref(), Some("satinalma"));
        assert_eq!(
            draft.email_subject_suggestion.as_deref(),
            Some("Sandalye Talebi")
        );
        // Absent fields default to empty.
        assert!(draft.email_body_suggestion.is_none());
    }

    #[test]
    fn draft_reply_falls_back_to_visible_text() {
        let text = "Görünen cevap\n---JSON---\n{\"email_intent\": true}\n---END---";
        let outcome = decode_marker(text);
        let draft = outcome.draft.unwrap();
        assert_eq!(draft.reply, "Görünen cevap");
    }

    #[test]
    fn decoding_is_idempotent() {
        let text = "cevap\n---JSON---\n{\"email_intent\": true}\n---END---";
        let first = decode_marker(text);
        let second = decode_marker(text);
        assert_eq!(first, second);

        let no_marker = decode_marker("hiç delimiter yok");
        assert_eq!(no_marker, decode_marker("hiç delimiter yok"));
    }

    #[test]
    fn end_before_start_yields_no_draft() {
        let text = "---END--- önce geldi ---JSON--- {\"email_intent\": true}";
        let outcome = decode_marker(text);
        assert!(outcome.draft.is_none());
        assert_eq!(outcome.visible_reply, text);
    }
}
