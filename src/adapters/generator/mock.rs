//! Mock generation adapters for testing.
//!
//! Configurable to return queued replies, stream scripted chunks, inject
//! errors and simulate latency; every call is recorded for verification.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::chat::{Reply, RoutingDecision};
use crate::domain::foundation::UserId;
use crate::ports::{
    ChatHandler, DispatchError, DraftDispatcher, GeneratorError, HandlerCall, RoutingError,
    RoutingOracle, TokenChunk, TokenStream,
};

type QueuedReply = Result<Reply, GeneratorError>;

#[derive(Debug, Clone, Default)]
struct StreamScript {
    chunks: Vec<String>,
    failure: Option<GeneratorError>,
}

/// Mock domain handler.
#[derive(Clone, Default)]
pub struct MockChatHandler {
    replies: Arc<Mutex<VecDeque<QueuedReply>>>,
    stream_script: Arc<Mutex<StreamScript>>,
    default_reply: Arc<Mutex<String>>,
    delay: Duration,
    chunk_delay: Duration,
    complete_calls: Arc<Mutex<Vec<HandlerCall>>>,
    stream_calls: Arc<Mutex<Vec<HandlerCall>>>,
}

impl MockChatHandler {
    /// Creates a mock with an empty queue and a generic default reply.
    pub fn new() -> Self {
        let mock = Self::default();
        *mock.default_reply.lock().unwrap() = "Mock cevap".to_string();
        mock
    }

    /// Sets simulated latency before every call completes or streams.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets simulated latency before each streamed chunk.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Sets the scripted chunks returned by `stream`.
    pub fn with_stream_chunks(self, chunks: Vec<&str>) -> Self {
        self.set_stream_chunks(chunks);
        self
    }

    /// Sets scripted chunks followed by a mid-stream failure.
    pub fn with_stream_failure(self, chunks: Vec<&str>, failure: GeneratorError) -> Self {
        {
            let mut script = self.stream_script.lock().unwrap();
            script.chunks = chunks.into_iter().map(str::to_string).collect();
            script.failure = Some(failure);
        }
        self
    }

    /// Sets the reply returned when the queue is exhausted.
    pub fn with_default_reply(self, reply: &str) -> Self {
        *self.default_reply.lock().unwrap() = reply.to_string();
        self
    }

    /// Replaces the scripted stream chunks.
    pub fn set_stream_chunks(&self, chunks: Vec<&str>) {
        let mut script = self.stream_script.lock().unwrap();
        script.chunks = chunks.into_iter().map(str::to_string).collect();
        script.failure = None;
    }

    /// Queues a reply for the next `complete` call.
    pub fn push_reply(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    /// Queues an error for the next `complete` call.
    pub fn push_error(&self, error: GeneratorError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Number of `complete` calls so far.
    pub fn complete_calls(&self) -> usize {
        self.complete_calls.lock().unwrap().len()
    }

    /// Number of `stream` calls so far.
    pub fn stream_calls(&self) -> usize {
        self.stream_calls.lock().unwrap().len()
    }

    /// The last message passed to `complete`, if any.
    pub fn last_message(&self) -> Option<String> {
        self.complete_calls
            .lock()
            .unwrap()
            .last()
            .map(|call| call.message.clone())
    }
}

#[async_trait]
impl ChatHandler for MockChatHandler {
    async fn complete(&self, call: HandlerCall) -> Result<Reply, GeneratorError> {
        self.complete_calls.lock().unwrap().push(call);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let queued = self.replies.lock().unwrap().pop_front();
        match queued {
            Some(result) => result,
            None => Ok(Reply::Plain(self.default_reply.lock().unwrap().clone())),
        }
    }

    async fn stream(&self, call: HandlerCall) -> Result<TokenStream, GeneratorError> {
        self.stream_calls.lock().unwrap().push(call);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let script = self.stream_script.lock().unwrap().clone();
        let chunk_delay = self.chunk_delay;

        let mut items: Vec<Result<TokenChunk, GeneratorError>> = script
            .chunks
            .into_iter()
            .map(|chunk| Ok(TokenChunk::new(chunk)))
            .collect();
        if let Some(failure) = script.failure {
            items.push(Err(failure));
        }

        let stream = stream::iter(items).then(move |item| async move {
            if !chunk_delay.is_zero() {
                sleep(chunk_delay).await;
            }
            item
        });

        Ok(Box::pin(stream))
    }
}

/// Mock routing oracle with a queue of decisions and a fallback default.
#[derive(Clone, Default)]
pub struct MockRoutingOracle {
    queue: Arc<Mutex<VecDeque<Result<RoutingDecision, RoutingError>>>>,
    default_decision: Arc<Mutex<Option<RoutingDecision>>>,
    calls: Arc<Mutex<Vec<(UserId, String)>>>,
}

impl MockRoutingOracle {
    /// Creates a mock with no configured decision.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the decision returned when the queue is empty.
    pub fn with_decision(self, decision: RoutingDecision) -> Self {
        *self.default_decision.lock().unwrap() = Some(decision);
        self
    }

    /// Queues a decision consumed before the default.
    pub fn push_decision(&self, decision: RoutingDecision) {
        self.queue.lock().unwrap().push_back(Ok(decision));
    }

    /// Queues a routing failure.
    pub fn push_error(&self, error: RoutingError) {
        self.queue.lock().unwrap().push_back(Err(error));
    }

    /// Number of routing calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RoutingOracle for MockRoutingOracle {
    async fn route(
        &self,
        user_id: &UserId,
        message: &str,
    ) -> Result<RoutingDecision, RoutingError> {
        self.calls
            .lock()
            .unwrap()
            .push((user_id.clone(), message.to_string()));

        if let Some(queued) = self.queue.lock().unwrap().pop_front() {
            return queued;
        }
        self.default_decision
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RoutingError::Unparseable("no routing decision configured".to_string()))
    }
}

/// Mock dispatch capability recording every directive.
#[derive(Clone, Default)]
pub struct MockDraftDispatcher {
    queue: Arc<Mutex<VecDeque<Result<String, DispatchError>>>>,
    directives: Arc<Mutex<Vec<String>>>,
}

impl MockDraftDispatcher {
    /// Creates a mock that acknowledges with "EMAIL_LOGGED" by default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an acknowledgement for the next dispatch.
    pub fn push_acknowledgement(&self, ack: &str) {
        self.queue.lock().unwrap().push_back(Ok(ack.to_string()));
    }

    /// Queues a dispatch failure.
    pub fn push_error(&self, error: DispatchError) {
        self.queue.lock().unwrap().push_back(Err(error));
    }

    /// Number of dispatch calls so far.
    pub fn call_count(&self) -> usize {
        self.directives.lock().unwrap().len()
    }

    /// The last directive received, if any.
    pub fn last_directive(&self) -> Option<String> {
        self.directives.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl DraftDispatcher for MockDraftDispatcher {
    async fn dispatch(&self, directive: &str) -> Result<String, DispatchError> {
        self.directives.lock().unwrap().push(directive.to_string());

        let queued = self.queue.lock().unwrap().pop_front();
        match queued {
            Some(result) => result,
            None => Ok("EMAIL_LOGGED".to_string()),
        }
    }
}
