//! Stream frame multiplexing for incremental replies.
//!
//! A streaming turn is a single-producer task emitting [`StreamFrame`]
//! values into a bounded channel. Plain token chunks, control events and
//! the terminal frame share the one channel; the transport adapter encodes
//! each frame as a `data: <JSON>` line.
//!
//! The trailing marker is decoded exactly once, from the fully-accumulated
//! text after the token stream terminates. A delimiter split across two
//! chunks is therefore never truncated.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::domain::chat::{decode_marker, prompts, DraftSuggestion, PendingAction};
use crate::ports::{ChatHandler, ConversationLog, HandlerCall, PendingActionStore};

/// Latency metrics reported in the terminal `end` frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StreamMetrics {
    /// Seconds from turn start to the first token chunk.
    pub first_token_seconds: f64,
    /// Seconds from turn start to stream termination.
    pub total_seconds: f64,
}

/// One frame of a streaming turn.
///
/// Exactly one terminal frame (`End` or `Error`) closes every stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamFrame {
    /// A chunk of visible reply text.
    Content { content: String },
    /// Routing metadata, emitted first on start-session streams only.
    SessionInfo {
        #[serde(rename = "type")]
        kind: &'static str,
        session_id: String,
        assigned_handler_id: String,
        assigned_handler_name: String,
        routing_reason: String,
    },
    /// A trailing marker with email intent was decoded.
    EmailIntent {
        #[serde(rename = "type")]
        kind: &'static str,
        recipient_hint: Option<String>,
        subject_suggestion: Option<String>,
    },
    /// Terminal frame of a successful stream.
    End {
        #[serde(rename = "type")]
        kind: &'static str,
        metrics: StreamMetrics,
        email_intent: bool,
    },
    /// Terminal frame of a failed stream.
    Error { error: String },
}

impl StreamFrame {
    /// Creates a content frame.
    pub fn content(text: impl Into<String>) -> Self {
        StreamFrame::Content {
            content: text.into(),
        }
    }

    /// Creates the start-only routing metadata frame.
    pub fn session_info(
        session_id: impl Into<String>,
        handler_id: impl Into<String>,
        handler_name: impl Into<String>,
        routing_reason: impl Into<String>,
    ) -> Self {
        StreamFrame::SessionInfo {
            kind: "session_info",
            session_id: session_id.into(),
            assigned_handler_id: handler_id.into(),
            assigned_handler_name: handler_name.into(),
            routing_reason: routing_reason.into(),
        }
    }

    /// Creates an email-intent frame from a decoded draft.
    pub fn email_intent(draft: &DraftSuggestion) -> Self {
        StreamFrame::EmailIntent {
            kind: "email_intent",
            recipient_hint: draft.email_recipient_hint.clone(),
            subject_suggestion: draft.email_subject_suggestion.clone(),
        }
    }

    /// Creates the successful terminal frame.
    pub fn end(metrics: StreamMetrics, email_intent: bool) -> Self {
        StreamFrame::End {
            kind: "end",
            metrics,
            email_intent,
        }
    }

    /// Creates the failure terminal frame.
    pub fn error(message: impl Into<String>) -> Self {
        StreamFrame::Error {
            error: message.into(),
        }
    }

    /// Returns true for frames that close the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamFrame::End { .. } | StreamFrame::Error { .. })
    }
}

/// Receiving half of a streaming turn's frame channel.
pub type FrameReceiver = mpsc::Receiver<StreamFrame>;

const FRAME_CHANNEL_CAPACITY: usize = 32;

/// Spawns the producer task for one streaming turn and returns the frame
/// receiver.
///
/// The whole token sequence runs under one absolute deadline; exceeding it
/// ends the stream with a terminal error frame, never a truncated end
/// frame. When the decoded marker carries email intent, the pending store
/// is updated before the terminal frame is emitted.
pub(crate) fn spawn_streaming_turn(
    handler: Arc<dyn ChatHandler>,
    call: HandlerCall,
    pending: Arc<dyn PendingActionStore>,
    log: Arc<dyn ConversationLog>,
    run_timeout: Duration,
    metrics_event: &'static str,
    preamble: Option<StreamFrame>,
) -> FrameReceiver {
    let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        if let Some(frame) = preamble {
            if tx.send(frame).await.is_err() {
                return;
            }
        }

        let started = Instant::now();
        let deadline = started + run_timeout;
        let session_id = call.session_id;
        let originating_message = call.message.clone();

        let mut stream = match tokio::time::timeout_at(deadline, handler.stream(call)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => {
                tracing::error!(%session_id, error = %err, "streaming turn failed to start");
                let _ = tx
                    .send(StreamFrame::error(prompts::MODEL_UNAVAILABLE_MESSAGE))
                    .await;
                return;
            }
            Err(_) => {
                tracing::error!(%session_id, "streaming turn timed out before first chunk");
                let _ = tx
                    .send(StreamFrame::error(prompts::MODEL_UNAVAILABLE_MESSAGE))
                    .await;
                return;
            }
        };

        let mut accumulated = String::new();
        let mut first_token_at: Option<Instant> = None;

        loop {
            let next = match tokio::time::timeout_at(deadline, stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::error!(%session_id, "streaming turn exceeded its deadline");
                    let _ = tx
                        .send(StreamFrame::error(prompts::MODEL_UNAVAILABLE_MESSAGE))
                        .await;
                    return;
                }
            };

            match next {
                None => break,
                Some(Ok(chunk)) => {
                    if first_token_at.is_none() {
                        first_token_at = Some(Instant::now());
                    }
                    if chunk.delta.is_empty() {
                        continue;
                    }
                    accumulated.push_str(&chunk.delta);
                    if tx.send(StreamFrame::content(chunk.delta)).await.is_err() {
                        return;
                    }
                }
                Some(Err(err)) => {
                    tracing::error!(%session_id, error = %err, "streaming turn failed mid-stream");
                    let _ = tx
                        .send(StreamFrame::error(prompts::MODEL_UNAVAILABLE_MESSAGE))
                        .await;
                    return;
                }
            }
        }

        let total_seconds = started.elapsed().as_secs_f64();
        let first_token_seconds = first_token_at
            .map(|at| (at - started).as_secs_f64())
            .unwrap_or(total_seconds);
        let metrics = StreamMetrics {
            first_token_seconds,
            total_seconds,
        };

        // Single end-of-stream evaluation; never per-chunk.
        let outcome = decode_marker(&accumulated);
        let email_intent = outcome.draft.is_some();

        if let Some(draft) = &outcome.draft {
            pending
                .put(
                    session_id,
                    PendingAction {
                        draft: draft.clone(),
                        rendered_reply: outcome.visible_reply.clone(),
                        originating_message,
                    },
                )
                .await;
            tracing::info!(%session_id, "email intent detected in stream marker; awaiting confirmation");
            if tx.send(StreamFrame::email_intent(draft)).await.is_err() {
                return;
            }
        }

        log.log_event(
            session_id,
            metrics_event,
            json!({
                "first_token_latency": metrics.first_token_seconds,
                "total_latency": metrics.total_seconds,
                "full_response": accumulated,
                "email_intent_detected": email_intent,
            }),
        )
        .await;

        let _ = tx.send(StreamFrame::end(metrics, email_intent)).await;
    });

    rx
}
