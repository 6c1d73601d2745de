//! StartSessionHandler - first-turn routing and first reply.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use thiserror::Error;
use tokio::time::Instant;

use crate::domain::chat::{prompts, PendingAction};
use crate::domain::foundation::{HandlerId, SessionId, UserId};
use crate::ports::{
    ChatHandler, ConversationLog, GeneratorError, HandlerCall, PendingActionStore, RoutingError,
    RoutingOracle,
};

use super::registry::HandlerRegistry;
use super::stream::{spawn_streaming_turn, FrameReceiver, StreamFrame};
use super::run_with_deadline;

/// Command to start a new chat session from a first message.
#[derive(Debug, Clone)]
pub struct StartSessionCommand {
    pub user_id: UserId,
    pub message: String,
}

/// Result of starting a session.
#[derive(Debug, Clone)]
pub struct StartSessionResult {
    pub session_id: SessionId,
    pub assigned_handler_id: HandlerId,
    pub assigned_handler_name: String,
    pub routing_reason: String,
    pub reply: String,
    pub latency_seconds: f64,
}

/// Errors surfaced by the start operation.
#[derive(Debug, Clone, Error)]
pub enum StartSessionError {
    /// The oracle answered with an unregistered or unreadable handler id.
    #[error("routing produced an invalid handler: {0}")]
    RoutingInvalid(String),

    /// The generation collaborator timed out or failed.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Anything else; detail is logged, never shown.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl From<GeneratorError> for StartSessionError {
    fn from(err: GeneratorError) -> Self {
        StartSessionError::ModelUnavailable(err.to_string())
    }
}

impl From<RoutingError> for StartSessionError {
    fn from(err: RoutingError) -> Self {
        match err {
            RoutingError::Unparseable(detail) => StartSessionError::RoutingInvalid(detail),
            RoutingError::Generator(inner) => inner.into(),
        }
    }
}

/// Handler for the start-session operation.
///
/// Exactly one routing call and one handler call per start, never more.
pub struct StartSessionHandler {
    oracle: Arc<dyn RoutingOracle>,
    registry: Arc<HandlerRegistry>,
    pending: Arc<dyn PendingActionStore>,
    log: Arc<dyn ConversationLog>,
    run_timeout: Duration,
}

impl StartSessionHandler {
    pub fn new(
        oracle: Arc<dyn RoutingOracle>,
        registry: Arc<HandlerRegistry>,
        pending: Arc<dyn PendingActionStore>,
        log: Arc<dyn ConversationLog>,
        run_timeout: Duration,
    ) -> Self {
        Self {
            oracle,
            registry,
            pending,
            log,
            run_timeout,
        }
    }

    /// Routes the first message and resolves the target handler.
    async fn route(
        &self,
        session_id: SessionId,
        cmd: &StartSessionCommand,
    ) -> Result<(HandlerId, String, Arc<dyn ChatHandler>), StartSessionError> {
        self.log
            .log_event(
                session_id,
                "start_chat_request",
                json!({"user_id": cmd.user_id.as_str(), "message": &cmd.message}),
            )
            .await;

        let decision = run_with_deadline(
            self.run_timeout,
            self.oracle.route(&cmd.user_id, &cmd.message),
        )
        .await?;

        let registered = self.registry.get(&decision.handler_id).ok_or_else(|| {
            tracing::error!(handler_id = %decision.handler_id, "routing returned unregistered handler");
            StartSessionError::RoutingInvalid(format!(
                "unregistered handler id: {}",
                decision.handler_id
            ))
        })?;

        tracing::info!(
            %session_id,
            handler_id = %decision.handler_id,
            reason = %decision.reason,
            "session routed"
        );

        Ok((
            decision.handler_id,
            decision.reason,
            registered.handler.clone(),
        ))
    }

    /// Starts a session and produces the complete first reply.
    pub async fn handle(
        &self,
        cmd: StartSessionCommand,
    ) -> Result<StartSessionResult, StartSessionError> {
        let session_id = SessionId::new();
        let (handler_id, reason, handler) = self.route(session_id, &cmd).await?;

        let started = Instant::now();
        let call = HandlerCall::new(&cmd.message, cmd.user_id.clone(), session_id);
        let reply = run_with_deadline(self.run_timeout, handler.complete(call)).await?;
        let latency_seconds = started.elapsed().as_secs_f64();

        let mut reply_text = reply.text().to_string();
        if let Some(draft) = reply.email_draft() {
            self.pending
                .put(session_id, PendingAction::new(draft.clone(), &cmd.message))
                .await;
            reply_text = prompts::with_confirmation_hint(&reply_text);
            tracing::info!(%session_id, "email intent detected during start; awaiting confirmation");
        }

        let result = StartSessionResult {
            session_id,
            assigned_handler_name: self.registry.display_name(&handler_id),
            assigned_handler_id: handler_id,
            routing_reason: reason,
            reply: reply_text,
            latency_seconds,
        };

        self.log
            .log_event(
                session_id,
                "start_chat_response",
                json!({
                    "assigned_handler_id": &result.assigned_handler_id,
                    "assigned_handler_name": &result.assigned_handler_name,
                    "routing_reason": &result.routing_reason,
                    "reply": &result.reply,
                }),
            )
            .await;

        Ok(result)
    }

    /// Starts a session in streaming mode.
    ///
    /// Routing failures surface as errors before any frame is produced;
    /// afterwards the stream opens with a `session_info` frame and closes
    /// with exactly one terminal frame.
    pub async fn handle_streaming(
        &self,
        cmd: StartSessionCommand,
    ) -> Result<FrameReceiver, StartSessionError> {
        let session_id = SessionId::new();
        let (handler_id, reason, handler) = self.route(session_id, &cmd).await?;

        let preamble = StreamFrame::session_info(
            session_id.to_string(),
            handler_id.to_string(),
            self.registry.display_name(&handler_id),
            reason,
        );

        let call = HandlerCall::new(&cmd.message, cmd.user_id.clone(), session_id);
        Ok(spawn_streaming_turn(
            handler,
            call,
            self.pending.clone(),
            self.log.clone(),
            self.run_timeout,
            "start_chat_stream_metrics",
            Some(preamble),
        ))
    }
}
