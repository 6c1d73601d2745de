//! Canonical user-facing texts and generation-mode prompt builders.
//!
//! These strings are behavioral constants: the confirmation hint suffix is
//! matched case-insensitively before appending, and the cancellation and
//! dispatch acknowledgements are returned verbatim.

use crate::domain::chat::DraftSuggestion;
use crate::domain::foundation::{SessionId, UserId};

/// Suffix appended to a reply that created a pending email draft, unless
/// the reply already contains it (case-insensitive check).
pub const CONFIRMATION_HINT: &str = "Mail taslağını göndermemi istiyorsan 'gönder' veya 'onaylıyorum' yazman yeterli. \
     Revize etmek için talimat verebilirsin.";

/// Fixed acknowledgement returned when the user cancels a pending draft.
pub const CANCELLATION_REPLY: &str = "Mail taslağı gönderilmeden iptal edildi. \
     İstersen yeni talimat vererek güncel bir taslak oluşturabilirsin.";

/// Prefix of the reply returned after a confirmed draft is dispatched.
pub const DISPATCH_THANKS_PREFIX: &str =
    "Onayınız için teşekkürler. Taslak mail aşağıdaki içerikle gönderildi:";

/// Generic user-safe message for generator failures (503-equivalent).
pub const MODEL_UNAVAILABLE_MESSAGE: &str =
    "AI servisi şu an kullanılamıyor. Lütfen daha sonra tekrar deneyin.";

/// Generic user-safe message for unexpected failures (500-equivalent).
pub const UNEXPECTED_ERROR_MESSAGE: &str =
    "Beklenmeyen bir hata oluştu. Lütfen tekrar deneyin.";

/// Appends the confirmation hint unless the reply already carries it.
pub fn with_confirmation_hint(reply: &str) -> String {
    if reply.to_lowercase().contains(&CONFIRMATION_HINT.to_lowercase()) {
        return reply.to_string();
    }
    format!("{reply}\n\n---\n{CONFIRMATION_HINT}")
}

/// Builds the combined reply after a successful dispatch, quoting the
/// pending draft's rendered reply and the dispatcher's acknowledgement.
pub fn dispatch_confirmation_reply(rendered_reply: &str, acknowledgement: &str) -> String {
    format!("{DISPATCH_THANKS_PREFIX}\n\n{rendered_reply}\n\n---\n{acknowledgement}")
}

/// Builds the `MODE: ROUTING` prompt sent to the routing oracle.
pub fn routing_prompt(user_id: &UserId, message: &str) -> String {
    format!(
        "MODE: ROUTING\n\n\
         USER_ID: {user_id}\n\n\
         Kullanıcıdan gelen mesaj aşağıdadır. \
         JSON formatında hangi agent'ın cevaplaması gerektiğini döndür.\n\n\
         USER_MESSAGE:\n{message}"
    )
}

/// Builds the `MODE: EMAIL` directive instructing the dispatcher to
/// finalize and send a confirmed draft exactly once.
pub fn dispatch_directive(
    user_id: &UserId,
    session_id: &SessionId,
    originating_message: &str,
    rendered_reply: &str,
    draft: &DraftSuggestion,
) -> String {
    let dash = "-".to_string();
    format!(
        "MODE: EMAIL\n\n\
         USER_ID: {user_id}\n\
         SESSION_ID: {session_id}\n\n\
         Aşağıda kullanıcı ile agent arasındaki mail taslağı bilgisi yer alıyor. \
         Taslağı profesyonel hale getir, gerekiyorsa düzelt ve mail gönderimini \
         bir kez gerçekleştir.\n\n\
         KULLANICI ORİJİNAL MESAJI:\n{originating_message}\n\n\
         AGENT TASLAK CEVABI:\n{rendered_reply}\n\n\
         EMAIL_RECIPIENT_HINT: {recipient}\n\
         EMAIL_SUBJECT_SUGGESTION: {subject}\n\
         EMAIL_BODY_SUGGESTION:\n{body}\n\n\
         ONAY DURUMU: Kullanıcı mailin gönderilmesini açıkça onayladı.",
        recipient = draft.email_recipient_hint.as_ref().unwrap_or(&dash),
        subject = draft.email_subject_suggestion.as_ref().unwrap_or(&dash),
        body = draft.email_body_suggestion.as_ref().unwrap_or(&dash),
    )
}
