//! Confirmation classifier for pending email drafts.
//!
//! Stateless keyword matching over the raw user message. Cancel keywords
//! take absolute precedence over confirm keywords: a message matching both
//! sets always classifies as `Cancel`.

/// Phrases that confirm sending the pending draft.
const CONFIRM_KEYWORDS: &[&str] = &[
    "gönder",
    "gonder",
    "gönderebilirsin",
    "gonderebilirsin",
    "gönderilebilir",
    "gonderilebilir",
    "onayla",
    "onayladım",
    "onayliyorum",
    "onay ver",
    "evet gönder",
    "maili gönder",
    "maili gonder",
];

/// Phrases that cancel the pending draft. Checked first.
const CANCEL_KEYWORDS: &[&str] = &[
    "gönderme",
    "gonderme",
    "iptal",
    "vazgeç",
    "vazgec",
    "gönderilmesin",
    "gonderilmesin",
];

/// Outcome of classifying a user message against a pending draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationSignal {
    /// The user confirmed the draft should be sent.
    Confirm,
    /// The user cancelled the draft.
    Cancel,
    /// Neither; the message is a new instruction.
    None,
}

fn normalize(message: &str) -> String {
    message.trim().to_lowercase()
}

fn contains_any(normalized: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| normalized.contains(kw))
}

/// Classifies a raw user message as confirm, cancel or neither.
pub fn classify_confirmation(message: &str) -> ConfirmationSignal {
    let normalized = normalize(message);
    if contains_any(&normalized, CANCEL_KEYWORDS) {
        return ConfirmationSignal::Cancel;
    }
    if contains_any(&normalized, CONFIRM_KEYWORDS) {
        return ConfirmationSignal::Confirm;
    }
    ConfirmationSignal::None
}
