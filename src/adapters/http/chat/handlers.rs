//! HTTP handlers connecting axum routes to the session orchestrator.
//!
//! Every orchestrator error is translated to a user-safe message here;
//! internal detail only reaches the diagnostic log.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::handlers::chat::{
    ContinueSessionCommand, ContinueSessionError, ContinueSessionHandler, HandlerRegistry,
    StartSessionCommand, StartSessionError, StartSessionHandler, StreamingContinue,
};
use crate::domain::chat::prompts;
use crate::domain::foundation::{HandlerId, SessionId, UserId};

use super::dto::{
    validate_message, ChatMessageRequest, ChatMessageResponse, ErrorResponse, HealthResponse,
    StartChatRequest, StartChatResponse,
};
use super::sse::sse_response;

/// Shared application state for the chat endpoints.
#[derive(Clone)]
pub struct ChatAppState {
    pub start_handler: Arc<StartSessionHandler>,
    pub continue_handler: Arc<ContinueSessionHandler>,
    pub registry: Arc<HandlerRegistry>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(detail: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(detail)))
}

fn map_start_error(err: StartSessionError) -> ApiError {
    match err {
        StartSessionError::RoutingInvalid(detail) => {
            tracing::error!(%detail, "chat start failed: invalid routing");
            bad_request("Mesaj uygun bir asistana yönlendirilemedi.")
        }
        StartSessionError::ModelUnavailable(detail) => {
            tracing::error!(%detail, "chat start failed: model unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new(prompts::MODEL_UNAVAILABLE_MESSAGE)),
            )
        }
        StartSessionError::Unexpected(detail) => {
            tracing::error!(%detail, "chat start failed unexpectedly");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(prompts::UNEXPECTED_ERROR_MESSAGE)),
            )
        }
    }
}

fn map_continue_error(err: ContinueSessionError) -> ApiError {
    match err {
        ContinueSessionError::HandlerNotFound(handler_id) => {
            tracing::warn!(%handler_id, "chat message addressed unknown handler");
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(format!(
                    "Asistan bulunamadı: {handler_id}"
                ))),
            )
        }
        ContinueSessionError::ModelUnavailable(detail) => {
            tracing::error!(%detail, "chat message failed: model unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new(prompts::MODEL_UNAVAILABLE_MESSAGE)),
            )
        }
        ContinueSessionError::Unexpected(detail) => {
            tracing::error!(%detail, "chat message failed unexpectedly");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(prompts::UNEXPECTED_ERROR_MESSAGE)),
            )
        }
    }
}

/// Start a new chat session.
///
/// POST /api/chat/start
pub async fn start_chat(
    State(state): State<ChatAppState>,
    Json(req): Json<StartChatRequest>,
) -> Result<Response, ApiError> {
    let user_id =
        UserId::new(req.user_id).map_err(|e| bad_request(e.to_string()))?;
    validate_message(&req.message).map_err(bad_request)?;

    let cmd = StartSessionCommand {
        user_id,
        message: req.message,
    };

    if req.stream {
        let rx = state
            .start_handler
            .handle_streaming(cmd)
            .await
            .map_err(map_start_error)?;
        return Ok(sse_response(rx).into_response());
    }

    let result = state
        .start_handler
        .handle(cmd)
        .await
        .map_err(map_start_error)?;

    let response = StartChatResponse {
        session_id: result.session_id.to_string(),
        assigned_handler_id: result.assigned_handler_id.to_string(),
        assigned_handler_name: result.assigned_handler_name,
        routing_reason: result.routing_reason,
        reply: result.reply,
        latency_seconds: result.latency_seconds,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Send a message in an existing session.
///
/// POST /api/chat/agents/{handler_id}
pub async fn chat_with_handler(
    State(state): State<ChatAppState>,
    Path(handler_id): Path<String>,
    Json(req): Json<ChatMessageRequest>,
) -> Result<Response, ApiError> {
    let user_id =
        UserId::new(req.user_id).map_err(|e| bad_request(e.to_string()))?;
    let session_id = SessionId::from_str(&req.session_id)
        .map_err(|_| bad_request("session_id must be a valid UUID"))?;
    validate_message(&req.message).map_err(bad_request)?;

    let cmd = ContinueSessionCommand {
        session_id,
        user_id,
        handler_id: HandlerId::new(handler_id),
        message: req.message,
    };

    if req.stream {
        match state
            .continue_handler
            .handle_streaming(cmd)
            .await
            .map_err(map_continue_error)?
        {
            StreamingContinue::Streaming(rx) => return Ok(sse_response(rx).into_response()),
            StreamingContinue::Immediate(result) => {
                // Confirm/cancel turns resolve without a token stream.
                let response = ChatMessageResponse {
                    reply: result.reply,
                    email_triggered: result.email_triggered,
                    email_info: result.email_info,
                };
                return Ok((StatusCode::OK, Json(response)).into_response());
            }
        }
    }

    let result = state
        .continue_handler
        .handle(cmd)
        .await
        .map_err(map_continue_error)?;

    let response = ChatMessageResponse {
        reply: result.reply,
        email_triggered: result.email_triggered,
        email_info: result.email_info,
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Health check with the registered handler ids.
///
/// GET /api/health
pub async fn health(State(state): State<ChatAppState>) -> impl IntoResponse {
    let mut available_handlers: Vec<String> = state
        .registry
        .ids()
        .into_iter()
        .map(|id| id.to_string())
        .collect();
    available_handlers.sort();

    Json(HealthResponse {
        status: "healthy",
        available_handlers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::generator::{MockChatHandler, MockDraftDispatcher, MockRoutingOracle};
    use crate::adapters::log::NullConversationLog;
    use crate::adapters::pending::InMemoryPendingStore;
    use crate::domain::chat::{Reply, RoutingDecision};
    use std::time::Duration;

    fn test_state() -> (ChatAppState, Arc<MockChatHandler>) {
        let handler = Arc::new(MockChatHandler::new());
        let oracle = Arc::new(MockRoutingOracle::new().with_decision(RoutingDecision {
            handler_id: HandlerId::new("procurement-agent"),
            reason: "talep satınalma ile ilgili".to_string(),
        }));
        let dispatcher = Arc::new(MockDraftDispatcher::new());
        let pending = Arc::new(InMemoryPendingStore::new());
        let log = Arc::new(NullConversationLog);
        let registry = Arc::new(HandlerRegistry::new().register(
            HandlerId::new("procurement-agent"),
            "Satınalma Asistanı",
            handler.clone(),
        ));

        let state = ChatAppState {
            start_handler: Arc::new(StartSessionHandler::new(
                oracle,
                registry.clone(),
                pending.clone(),
                log.clone(),
                Duration::from_secs(5),
            )),
            continue_handler: Arc::new(ContinueSessionHandler::new(
                registry.clone(),
                dispatcher,
                pending,
                log,
                Duration::from_secs(5),
            )),
            registry,
        };
        (state, handler)
    }

    #[tokio::test]
    async fn start_chat_returns_created() {
        let (state, handler) = test_state();
        handler.push_reply(Reply::Plain("Talebinizi aldım.".to_string()));

        let req = StartChatRequest {
            user_id: "u1".to_string(),
            message: "Ofis sandalyesi lazım".to_string(),
            stream: false,
        };

        let response = start_chat(State(state), Json(req)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn start_chat_rejects_empty_user() {
        let (state, _) = test_state();
        let req = StartChatRequest {
            user_id: "  ".to_string(),
            message: "merhaba".to_string(),
            stream: false,
        };

        let err = start_chat(State(state), Json(req)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chat_rejects_malformed_session_id() {
        let (state, _) = test_state();
        let req = ChatMessageRequest {
            user_id: "u1".to_string(),
            session_id: "not-a-uuid".to_string(),
            message: "merhaba".to_string(),
            stream: false,
        };

        let err = chat_with_handler(
            State(state),
            Path("procurement-agent".to_string()),
            Json(req),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chat_with_unknown_handler_is_404() {
        let (state, _) = test_state();
        let req = ChatMessageRequest {
            user_id: "u1".to_string(),
            session_id: SessionId::new().to_string(),
            message: "merhaba".to_string(),
            stream: false,
        };

        let err = chat_with_handler(State(state), Path("ghost".to_string()), Json(req))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn chat_message_succeeds() {
        let (state, handler) = test_state();
        handler.push_reply(Reply::Plain("tamamdır".to_string()));

        let req = ChatMessageRequest {
            user_id: "u1".to_string(),
            session_id: SessionId::new().to_string(),
            message: "devam".to_string(),
            stream: false,
        };

        let response = chat_with_handler(
            State(state),
            Path("procurement-agent".to_string()),
            Json(req),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_lists_handlers() {
        let (state, _) = test_state();
        let response = health(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
