//! Gemini generation adapter.
//!
//! Implements the routing, handler and dispatch ports against Google's
//! Gemini `generateContent` API. The routing oracle and the dispatcher
//! share one backend with the domain handlers; they differ only in the
//! directive mode (`MODE: ROUTING` / `MODE: EMAIL`) prefixed to the
//! request, and in how the answer is parsed.
//!
//! Streaming uses the `streamGenerateContent?alt=sse` endpoint; each SSE
//! `data:` line carries a JSON fragment with a text delta.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::chat::{prompts, DraftSuggestion, Reply, RoutingDecision};
use crate::domain::foundation::{HandlerId, UserId};
use crate::ports::{
    ChatHandler, DispatchError, DraftDispatcher, GeneratorError, HandlerCall, RoutingError,
    RoutingOracle, TokenChunk, TokenStream,
};

/// Shared Gemini client configuration and HTTP plumbing.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: Secret<String>,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    /// Creates a client for the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to create HTTP client");
        Self {
            api_key: Secret::new(api_key.into()),
            model: model.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            client,
        }
    }

    /// Overrides the API base URL (for proxies and tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    async fn send(&self, url: String, request: &GeminiRequest) -> Result<Response, GeneratorError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    GeneratorError::Network(format!("connection failed: {e}"))
                } else {
                    GeneratorError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GeneratorError::Provider(format!(
            "status {status}: {body}"
        )))
    }

    /// Generates a complete text answer for one prompt.
    pub async fn complete_text(
        &self,
        system_instruction: Option<&str>,
        prompt: &str,
    ) -> Result<String, GeneratorError> {
        let request = GeminiRequest::new(system_instruction, prompt);
        let response = self.send(self.generate_url(), &request).await?;
        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::Parse(e.to_string()))?;
        Ok(extract_text(&parsed))
    }

    /// Generates a token stream for one prompt.
    pub async fn stream_text(
        &self,
        system_instruction: Option<&str>,
        prompt: &str,
    ) -> Result<TokenStream, GeneratorError> {
        let request = GeminiRequest::new(system_instruction, prompt);
        let response = self.send(self.stream_url(), &request).await?;

        let stream = response
            .bytes_stream()
            .map(|chunk_result| match chunk_result {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    parse_sse_deltas(&text)
                        .into_iter()
                        .map(|delta| Ok(TokenChunk::new(delta)))
                        .collect()
                }
                Err(e) => vec![Err(GeneratorError::Network(format!("stream error: {e}")))],
            })
            .flat_map(stream::iter);

        Ok(Box::pin(stream))
    }
}

/// Extracts the concatenated text parts of the first candidate.
fn extract_text(response: &GeminiResponse) -> String {
    response
        .candidates
        .first()
        .map(|candidate| {
            candidate
                .content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

/// Extracts text deltas from a block of SSE `data:` lines.
fn parse_sse_deltas(block: &str) -> Vec<String> {
    block
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter(|payload| *payload != "[DONE]")
        .filter_map(|payload| serde_json::from_str::<GeminiResponse>(payload).ok())
        .map(|fragment| extract_text(&fragment))
        .filter(|delta| !delta.is_empty())
        .collect()
}

/// Strips Markdown code fences the model sometimes wraps JSON answers in.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Parses the routing oracle's JSON answer.
fn parse_routing_decision(text: &str) -> Result<RoutingDecision, RoutingError> {
    #[derive(Deserialize)]
    struct RoutingPayload {
        #[serde(alias = "target_agent_id", alias = "target_handler_id")]
        handler_id: String,
        #[serde(default)]
        reason: String,
    }

    let payload: RoutingPayload = serde_json::from_str(strip_code_fences(text))
        .map_err(|e| RoutingError::Unparseable(format!("{e}: {text}")))?;
    if payload.handler_id.is_empty() {
        return Err(RoutingError::Unparseable(
            "routing answer carried no handler id".to_string(),
        ));
    }
    Ok(RoutingDecision {
        handler_id: HandlerId::new(payload.handler_id),
        reason: payload.reason,
    })
}

/// Normalizes a handler answer into the orchestrator's reply shape.
///
/// Structured-output answers arrive as a JSON object; anything else is a
/// plain text reply.
fn parse_handler_reply(text: &str) -> Reply {
    let candidate = strip_code_fences(text);
    if candidate.starts_with('{') {
        if let Ok(draft) = serde_json::from_str::<DraftSuggestion>(candidate) {
            if !draft.reply.is_empty() || draft.email_intent {
                return Reply::Structured(draft);
            }
        }
    }
    Reply::Plain(text.trim().to_string())
}

/// Routing oracle backed by Gemini.
pub struct GeminiRoutingOracle {
    client: GeminiClient,
    instructions: String,
}

impl GeminiRoutingOracle {
    /// Creates an oracle with the orchestrator routing instructions.
    pub fn new(client: GeminiClient, instructions: impl Into<String>) -> Self {
        Self {
            client,
            instructions: instructions.into(),
        }
    }
}

#[async_trait]
impl RoutingOracle for GeminiRoutingOracle {
    async fn route(
        &self,
        user_id: &UserId,
        message: &str,
    ) -> Result<RoutingDecision, RoutingError> {
        let prompt = prompts::routing_prompt(user_id, message);
        let answer = self
            .client
            .complete_text(Some(&self.instructions), &prompt)
            .await?;
        parse_routing_decision(&answer)
    }
}

/// Domain handler backed by Gemini.
pub struct GeminiHandler {
    client: GeminiClient,
    instructions: String,
}

impl GeminiHandler {
    /// Creates a handler with its domain instructions.
    pub fn new(client: GeminiClient, instructions: impl Into<String>) -> Self {
        Self {
            client,
            instructions: instructions.into(),
        }
    }
}

#[async_trait]
impl ChatHandler for GeminiHandler {
    async fn complete(&self, call: HandlerCall) -> Result<Reply, GeneratorError> {
        tracing::debug!(
            session_id = %call.session_id,
            user_id = %call.user_id,
            "running gemini handler"
        );
        let answer = self
            .client
            .complete_text(Some(&self.instructions), &call.message)
            .await?;
        Ok(parse_handler_reply(&answer))
    }

    async fn stream(&self, call: HandlerCall) -> Result<TokenStream, GeneratorError> {
        tracing::debug!(
            session_id = %call.session_id,
            user_id = %call.user_id,
            "running gemini handler in stream mode"
        );
        self.client
            .stream_text(Some(&self.instructions), &call.message)
            .await
    }
}

/// Dispatch capability backed by Gemini in `MODE: EMAIL`.
pub struct GeminiDispatcher {
    client: GeminiClient,
    instructions: String,
}

impl GeminiDispatcher {
    /// Creates a dispatcher with the orchestrator email instructions.
    pub fn new(client: GeminiClient, instructions: impl Into<String>) -> Self {
        Self {
            client,
            instructions: instructions.into(),
        }
    }
}

#[async_trait]
impl DraftDispatcher for GeminiDispatcher {
    async fn dispatch(&self, directive: &str) -> Result<String, DispatchError> {
        let acknowledgement = self
            .client
            .complete_text(Some(&self.instructions), directive)
            .await?;
        Ok(acknowledgement)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
}

impl GeminiRequest {
    fn new(system_instruction: Option<&str>, prompt: &str) -> Self {
        Self {
            system_instruction: system_instruction.map(GeminiContent::from_text),
            contents: vec![GeminiContent::from_text(prompt)],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn from_text(text: &str) -> Self {
        Self {
            parts: vec![GeminiPart {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_text_joins_candidate_parts() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "Merhaba "}, {"text": "dünya"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(&response), "Merhaba dünya");
    }

    #[test]
    fn extract_text_tolerates_empty_response() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(extract_text(&response), "");
    }

    #[test]
    fn sse_deltas_are_parsed_per_line() {
        let block = concat!(
            "data: {\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"bir\"}]}}]}\n",
            "\n",
            "data: {\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"iki\"}]}}]}\n",
            "data: [DONE]\n",
        );
        assert_eq!(parse_sse_deltas(block), vec!["bir", "iki"]);
    }

    #[test]
    fn unparseable_sse_lines_are_skipped() {
        let block = "data: not-json\nevent: ping\n";
        assert!(parse_sse_deltas(block).is_empty());
    }

    #[test]
    fn routing_decision_parses_plain_json() {
        let decision =
            parse_routing_decision(r#"{"handler_id": "procurement-agent", "reason": "talep"}"#)
                .unwrap();
        assert_eq!(decision.handler_id, HandlerId::new("procurement-agent"));
        assert_eq!(decision.reason, "talep");
    }

    #[test]
    fn routing_decision_accepts_legacy_field_and_fences() {
        let decision = parse_routing_decision(
            "```json\n{\"target_agent_id\": \"procurement-agent\", \"reason\": \"r\"}\n```",
        )
        .unwrap();
        assert_eq!(decision.handler_id, HandlerId::new("procurement-agent"));
    }

    #[test]
    fn routing_decision_rejects_prose() {
        assert!(matches!(
            parse_routing_decision("bilmiyorum"),
            Err(RoutingError::Unparseable(_))
        ));
    }

    #[test]
    fn routing_decision_rejects_empty_handler_id() {
        assert!(parse_routing_decision(r#"{"handler_id": "", "reason": "r"}"#).is_err());
    }

    #[test]
    fn handler_reply_normalizes_structured_json() {
        let reply = parse_handler_reply(
            r#"{"reply": "Taslak hazır", "email_intent": true, "email_recipient_hint": "satinalma"}"#,
        );
        match reply {
            Reply::Structured(draft) => {
                assert!(draft.email_intent);
                assert_eq!(draft.reply, "Taslak hazır");
            }
            Reply::Plain(_) => panic!("expected structured reply"),
        }
    }

    #[test]
    fn handler_reply_falls_back_to_plain_text() {
        let reply = parse_handler_reply("Sadece düz bir cevap.");
        assert_eq!(reply, Reply::Plain("Sadece düz bir cevap.".to_string()));
    }

    #[test]
    fn handler_reply_treats_unrelated_json_as_plain() {
        let reply = parse_handler_reply(r#"{"foo": 1}"#);
        assert!(matches!(reply, Reply::Plain(_)));
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("``` {\"a\":1} ```"), "{\"a\":1}");
    }
}
