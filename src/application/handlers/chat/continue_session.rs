//! ContinueSessionHandler - subsequent turns and the pending-draft
//! confirm/cancel lifecycle.
//!
//! A pending email draft short-circuits normal dispatch until the user
//! confirms, cancels, or supersedes it with a new instruction. Cancel
//! keywords always win over confirm keywords.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::domain::chat::{
    classify_confirmation, prompts, ConfirmationSignal, PendingAction,
};
use crate::domain::foundation::{HandlerId, SessionId, UserId};
use crate::ports::{
    ConversationLog, DispatchError, DraftDispatcher, GeneratorError, HandlerCall,
    PendingActionStore,
};

use super::registry::HandlerRegistry;
use super::run_with_deadline;
use super::stream::{spawn_streaming_turn, FrameReceiver};

/// Command for one turn in an existing session.
#[derive(Debug, Clone)]
pub struct ContinueSessionCommand {
    pub session_id: SessionId,
    pub user_id: UserId,
    /// The handler bound to the session at start.
    pub handler_id: HandlerId,
    pub message: String,
}

/// Email-related metadata attached to a turn's result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EmailInfo {
    /// A draft was created and awaits confirmation.
    PendingConfirmation {
        pending_confirmation: bool,
        recipient_hint: Option<String>,
        subject_suggestion: Option<String>,
    },
    /// A confirmed draft was dispatched.
    Dispatched {
        dispatcher_reply: String,
        recipient_hint: Option<String>,
        subject_suggestion: Option<String>,
    },
}

/// Result of one continue turn.
#[derive(Debug, Clone)]
pub struct ContinueSessionResult {
    pub reply: String,
    pub email_triggered: bool,
    pub email_info: Option<EmailInfo>,
}

/// Errors surfaced by the continue operation.
#[derive(Debug, Clone, Error)]
pub enum ContinueSessionError {
    /// The addressed handler id is not registered.
    #[error("handler not found: {0}")]
    HandlerNotFound(HandlerId),

    /// The generation collaborator timed out or failed.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Anything else; detail is logged, never shown.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl From<GeneratorError> for ContinueSessionError {
    fn from(err: GeneratorError) -> Self {
        ContinueSessionError::ModelUnavailable(err.to_string())
    }
}

impl From<DispatchError> for ContinueSessionError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Generator(inner) => inner.into(),
            DispatchError::MailService(detail) => ContinueSessionError::Unexpected(detail),
        }
    }
}

/// Outcome of a streaming continue turn.
///
/// Confirm and cancel turns resolve without invoking the domain handler,
/// so they produce an immediate result even when streaming was requested.
pub enum StreamingContinue {
    Immediate(ContinueSessionResult),
    Streaming(FrameReceiver),
}

/// Handler for the continue-session operation.
pub struct ContinueSessionHandler {
    registry: Arc<HandlerRegistry>,
    dispatcher: Arc<dyn DraftDispatcher>,
    pending: Arc<dyn PendingActionStore>,
    log: Arc<dyn ConversationLog>,
    run_timeout: Duration,
}

impl ContinueSessionHandler {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        dispatcher: Arc<dyn DraftDispatcher>,
        pending: Arc<dyn PendingActionStore>,
        log: Arc<dyn ConversationLog>,
        run_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            pending,
            log,
            run_timeout,
        }
    }

    /// Resolves a pending draft against the incoming message, if one exists.
    ///
    /// Returns a finished turn result for confirm and cancel; `None` means
    /// the turn falls through to normal dispatch (after discarding any
    /// superseded draft).
    async fn resolve_pending(
        &self,
        cmd: &ContinueSessionCommand,
    ) -> Result<Option<ContinueSessionResult>, ContinueSessionError> {
        let Some(peeked) = self.pending.peek(cmd.session_id).await else {
            return Ok(None);
        };

        match classify_confirmation(&cmd.message) {
            ConfirmationSignal::Cancel => {
                self.pending.take(cmd.session_id).await;
                tracing::info!(session_id = %cmd.session_id, "pending email cancelled");
                Ok(Some(ContinueSessionResult {
                    reply: prompts::CANCELLATION_REPLY.to_string(),
                    email_triggered: false,
                    email_info: None,
                }))
            }
            ConfirmationSignal::Confirm => {
                // Removed before dispatch; stays removed even if dispatch fails.
                let action = self
                    .pending
                    .take(cmd.session_id)
                    .await
                    .unwrap_or(peeked);
                let result = self.dispatch_confirmed(cmd, action).await?;
                Ok(Some(result))
            }
            ConfirmationSignal::None => {
                // New instruction supersedes the draft.
                self.pending.take(cmd.session_id).await;
                tracing::debug!(
                    session_id = %cmd.session_id,
                    "pending email superseded by new instruction"
                );
                Ok(None)
            }
        }
    }

    /// Executes the confirmed draft's side effect exactly once.
    async fn dispatch_confirmed(
        &self,
        cmd: &ContinueSessionCommand,
        action: PendingAction,
    ) -> Result<ContinueSessionResult, ContinueSessionError> {
        let directive = prompts::dispatch_directive(
            &cmd.user_id,
            &cmd.session_id,
            &action.originating_message,
            &action.rendered_reply,
            &action.draft,
        );

        let acknowledgement =
            run_with_deadline(self.run_timeout, self.dispatcher.dispatch(&directive)).await?;

        tracing::info!(session_id = %cmd.session_id, "confirmed email draft dispatched");

        Ok(ContinueSessionResult {
            reply: prompts::dispatch_confirmation_reply(&action.rendered_reply, &acknowledgement),
            email_triggered: true,
            email_info: Some(EmailInfo::Dispatched {
                dispatcher_reply: acknowledgement,
                recipient_hint: action.draft.email_recipient_hint.clone(),
                subject_suggestion: action.draft.email_subject_suggestion.clone(),
            }),
        })
    }

    fn resolve_handler(
        &self,
        cmd: &ContinueSessionCommand,
    ) -> Result<Arc<dyn crate::ports::ChatHandler>, ContinueSessionError> {
        self.registry
            .get(&cmd.handler_id)
            .map(|registered| registered.handler.clone())
            .ok_or_else(|| {
                tracing::warn!(handler_id = %cmd.handler_id, "continue addressed unknown handler");
                ContinueSessionError::HandlerNotFound(cmd.handler_id.clone())
            })
    }

    async fn log_request(&self, cmd: &ContinueSessionCommand) {
        self.log
            .log_event(
                cmd.session_id,
                "chat_message_request",
                json!({
                    "handler_id": &cmd.handler_id,
                    "user_id": cmd.user_id.as_str(),
                    "message": &cmd.message,
                }),
            )
            .await;
    }

    async fn log_response(&self, cmd: &ContinueSessionCommand, result: &ContinueSessionResult) {
        self.log
            .log_event(
                cmd.session_id,
                "chat_message_response",
                json!({
                    "handler_id": &cmd.handler_id,
                    "reply": &result.reply,
                    "email_triggered": result.email_triggered,
                    "email_info": &result.email_info,
                }),
            )
            .await;
    }

    /// Handles one complete (non-streaming) turn.
    pub async fn handle(
        &self,
        cmd: ContinueSessionCommand,
    ) -> Result<ContinueSessionResult, ContinueSessionError> {
        self.log_request(&cmd).await;
        let handler = self.resolve_handler(&cmd)?;

        if let Some(result) = self.resolve_pending(&cmd).await? {
            self.log_response(&cmd, &result).await;
            return Ok(result);
        }

        let call = HandlerCall::new(&cmd.message, cmd.user_id.clone(), cmd.session_id);
        let reply = run_with_deadline(self.run_timeout, handler.complete(call)).await?;

        let mut reply_text = reply.text().to_string();
        let mut email_info = None;
        if let Some(draft) = reply.email_draft() {
            self.pending
                .put(
                    cmd.session_id,
                    PendingAction::new(draft.clone(), &cmd.message),
                )
                .await;
            reply_text = prompts::with_confirmation_hint(&reply_text);
            email_info = Some(EmailInfo::PendingConfirmation {
                pending_confirmation: true,
                recipient_hint: draft.email_recipient_hint.clone(),
                subject_suggestion: draft.email_subject_suggestion.clone(),
            });
            tracing::info!(
                session_id = %cmd.session_id,
                "email intent detected, awaiting user confirmation before sending"
            );
        }

        let result = ContinueSessionResult {
            reply: reply_text,
            email_triggered: false,
            email_info,
        };
        self.log_response(&cmd, &result).await;
        Ok(result)
    }

    /// Handles one turn in streaming mode.
    ///
    /// Pending confirm/cancel turns resolve immediately (no handler call,
    /// nothing to stream); all other turns return a frame receiver.
    pub async fn handle_streaming(
        &self,
        cmd: ContinueSessionCommand,
    ) -> Result<StreamingContinue, ContinueSessionError> {
        self.log_request(&cmd).await;
        let handler = self.resolve_handler(&cmd)?;

        if let Some(result) = self.resolve_pending(&cmd).await? {
            self.log_response(&cmd, &result).await;
            return Ok(StreamingContinue::Immediate(result));
        }

        let call = HandlerCall::new(&cmd.message, cmd.user_id.clone(), cmd.session_id);
        Ok(StreamingContinue::Streaming(spawn_streaming_turn(
            handler,
            call,
            self.pending.clone(),
            self.log.clone(),
            self.run_timeout,
            "chat_message_stream_metrics",
            None,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::generator::{MockChatHandler, MockDraftDispatcher};
    use crate::adapters::log::NullConversationLog;
    use crate::adapters::pending::InMemoryPendingStore;
    use crate::domain::chat::{DraftSuggestion, Reply};

    struct Fixture {
        handler: Arc<MockChatHandler>,
        dispatcher: Arc<MockDraftDispatcher>,
        pending: Arc<InMemoryPendingStore>,
        cont: ContinueSessionHandler,
    }

    fn fixture() -> Fixture {
        let handler = Arc::new(MockChatHandler::new());
        let dispatcher = Arc::new(MockDraftDispatcher::new());
        let pending = Arc::new(InMemoryPendingStore::new());
        let registry = Arc::new(HandlerRegistry::new().register(
            HandlerId::new("procurement-agent"),
            "Satınalma Asistanı",
            handler.clone(),
        ));
        let cont = ContinueSessionHandler::new(
            registry,
            dispatcher.clone(),
            pending.clone(),
            Arc::new(NullConversationLog),
            Duration::from_secs(5),
        );
        Fixture {
            handler,
            dispatcher,
            pending,
            cont,
        }
    }

    fn cmd(session_id: SessionId, message: &str) -> ContinueSessionCommand {
        ContinueSessionCommand {
            session_id,
            user_id: UserId::new("u1").unwrap(),
            handler_id: HandlerId::new("procurement-agent"),
            message: message.to_string(),
        }
    }

    fn sample_pending() -> PendingAction {
        PendingAction::new(
            DraftSuggestion {
                reply: "Taslak hazır".to_string(),
                email_intent: true,
                email_recipient_hint: Some("satinalma".to_string()),
                email_subject_suggestion: Some("Sandalye Talebi".to_string()),
                ..Default::default()
            },
            "Ofis sandalyesi lazım",
        )
    }

    #[tokio::test]
    async fn unknown_handler_is_not_found() {
        let fx = fixture();
        let mut command = cmd(SessionId::new(), "merhaba");
        command.handler_id = HandlerId::new("ghost");

        let err = fx.cont.handle(command).await.unwrap_err();
        assert!(matches!(err, ContinueSessionError::HandlerNotFound(_)));
    }

    #[tokio::test]
    async fn no_pending_dispatches_handler_exactly_once() {
        let fx = fixture();
        fx.handler.push_reply(Reply::Plain("tamamdır".to_string()));
        let session_id = SessionId::new();

        let result = fx.cont.handle(cmd(session_id, "devam edelim")).await.unwrap();

        assert_eq!(result.reply, "tamamdır");
        assert!(!result.email_triggered);
        assert_eq!(fx.handler.complete_calls(), 1);
        assert_eq!(fx.dispatcher.call_count(), 0);
        assert!(fx.pending.peek(session_id).await.is_none());
    }

    #[tokio::test]
    async fn confirm_clears_pending_and_dispatches_once() {
        let fx = fixture();
        fx.dispatcher.push_acknowledgement("Mail gönderildi.");
        let session_id = SessionId::new();
        fx.pending.put(session_id, sample_pending()).await;

        let result = fx.cont.handle(cmd(session_id, "gönder")).await.unwrap();

        assert!(result.email_triggered);
        assert!(result.reply.starts_with(prompts::DISPATCH_THANKS_PREFIX));
        assert!(result.reply.contains("Taslak hazır"));
        assert!(result.reply.contains("Mail gönderildi."));
        assert_eq!(fx.dispatcher.call_count(), 1);
        // The handler is never invoked on a confirm turn.
        assert_eq!(fx.handler.complete_calls(), 0);
        assert!(fx.pending.peek(session_id).await.is_none());

        let directive = fx.dispatcher.last_directive().unwrap();
        assert!(directive.starts_with("MODE: EMAIL"));
        assert!(directive.contains("Ofis sandalyesi lazım"));
    }

    #[tokio::test]
    async fn cancel_clears_pending_without_dispatch() {
        let fx = fixture();
        let session_id = SessionId::new();
        fx.pending.put(session_id, sample_pending()).await;

        let result = fx.cont.handle(cmd(session_id, "iptal et")).await.unwrap();

        assert_eq!(result.reply, prompts::CANCELLATION_REPLY);
        assert!(!result.email_triggered);
        assert_eq!(fx.dispatcher.call_count(), 0);
        assert_eq!(fx.handler.complete_calls(), 0);
        assert!(fx.pending.peek(session_id).await.is_none());
    }

    #[tokio::test]
    async fn new_instruction_supersedes_pending_silently() {
        let fx = fixture();
        fx.handler
            .push_reply(Reply::Plain("yeni cevap".to_string()));
        let session_id = SessionId::new();
        fx.pending.put(session_id, sample_pending()).await;

        let result = fx
            .cont
            .handle(cmd(session_id, "aslında farklı bir şey sor"))
            .await
            .unwrap();

        assert_eq!(result.reply, "yeni cevap");
        assert_eq!(fx.dispatcher.call_count(), 0);
        assert_eq!(fx.handler.complete_calls(), 1);
        assert!(fx.pending.peek(session_id).await.is_none());
    }

    #[tokio::test]
    async fn pending_stays_removed_when_dispatch_fails() {
        let fx = fixture();
        fx.dispatcher
            .push_error(DispatchError::Generator(GeneratorError::Provider(
                "down".to_string(),
            )));
        let session_id = SessionId::new();
        fx.pending.put(session_id, sample_pending()).await;

        let err = fx.cont.handle(cmd(session_id, "onayla")).await.unwrap_err();

        assert!(matches!(err, ContinueSessionError::ModelUnavailable(_)));
        // Removed before dispatch; a failed dispatch does not restore it.
        assert!(fx.pending.peek(session_id).await.is_none());
    }

    #[tokio::test]
    async fn intent_reply_creates_pending_with_hint() {
        let fx = fixture();
        fx.handler.push_reply(Reply::Structured(DraftSuggestion {
            reply: "Taslağı güncelledim".to_string(),
            email_intent: true,
            email_recipient_hint: Some("satinalma".to_string()),
            ..Default::default()
        }));
        let session_id = SessionId::new();

        let result = fx
            .cont
            .handle(cmd(session_id, "alıcıyı değiştir"))
            .await
            .unwrap();

        assert!(result.reply.contains(prompts::CONFIRMATION_HINT));
        assert!(!result.email_triggered);
        assert!(matches!(
            result.email_info,
            Some(EmailInfo::PendingConfirmation { .. })
        ));
        assert!(fx.pending.peek(session_id).await.is_some());
    }

    #[tokio::test]
    async fn cancel_wins_over_confirm_in_one_message() {
        let fx = fixture();
        let session_id = SessionId::new();
        fx.pending.put(session_id, sample_pending()).await;

        let result = fx
            .cont
            .handle(cmd(session_id, "onayla ama aslında gönderme"))
            .await
            .unwrap();

        assert_eq!(result.reply, prompts::CANCELLATION_REPLY);
        assert_eq!(fx.dispatcher.call_count(), 0);
    }

    #[tokio::test]
    async fn streaming_confirm_resolves_immediately() {
        let fx = fixture();
        fx.dispatcher.push_acknowledgement("Mail gönderildi.");
        let session_id = SessionId::new();
        fx.pending.put(session_id, sample_pending()).await;

        let outcome = fx
            .cont
            .handle_streaming(cmd(session_id, "gönder"))
            .await
            .unwrap();

        match outcome {
            StreamingContinue::Immediate(result) => assert!(result.email_triggered),
            StreamingContinue::Streaming(_) => panic!("confirm turn must not stream"),
        }
    }

    #[tokio::test]
    async fn streaming_turn_without_pending_streams() {
        let fx = fixture();
        fx.handler.set_stream_chunks(vec!["parça"]);

        let outcome = fx
            .cont
            .handle_streaming(cmd(SessionId::new(), "devam"))
            .await
            .unwrap();

        assert!(matches!(outcome, StreamingContinue::Streaming(_)));
    }
}
