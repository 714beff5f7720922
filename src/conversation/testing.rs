//! Mock collaborators for testing
//!
//! These mocks let conversations run end to end without any network I/O.

use super::{Participant, Responder, ResponderError, TurnContext};
use crate::error::ErrorKind;
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use crate::search::{SearchError, SearchService};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Scripted responder
// ============================================================================

/// What a responder saw on one call
#[derive(Debug, Clone)]
pub struct RecordedTurn {
    pub speaker: String,
    pub transcript_len: usize,
    pub task: Option<String>,
    pub attempt: u32,
}

/// Responder that plays back queued results, then a fallback
pub struct ScriptedResponder {
    script: Mutex<VecDeque<Result<String, ResponderError>>>,
    fallback: Result<String, ResponderError>,
    /// Record of every call
    pub calls: Mutex<Vec<RecordedTurn>>,
}

impl ScriptedResponder {
    /// Play `replies` in order. Once they run out every call fails as
    /// non-retryable.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(replies.into_iter().map(|r| Ok(r.into())).collect())
    }

    pub fn from_results(script: Vec<Result<String, ResponderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Err(ResponderError::new(
                ErrorKind::InvalidRequest,
                "script exhausted",
            )),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with the same content
    pub fn repeating(reply: impl Into<String>) -> Self {
        let mut responder = Self::from_results(Vec::new());
        responder.fallback = Ok(reply.into());
        responder
    }

    /// Always fail with the given kind
    pub fn failing(kind: ErrorKind) -> Self {
        let mut responder = Self::from_results(Vec::new());
        responder.fallback = Err(ResponderError::new(kind, format!("scripted {kind} failure")));
        responder
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn recorded_calls(&self) -> Vec<RecordedTurn> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn respond(&self, ctx: &TurnContext<'_>) -> Result<String, ResponderError> {
        self.calls.lock().unwrap().push(RecordedTurn {
            speaker: ctx.speaker.to_string(),
            transcript_len: ctx.transcript.len(),
            task: ctx.task.map(|t| t.description.clone()),
            attempt: ctx.attempt,
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Responder that sleeps before answering (for timeout testing)
pub struct SlowResponder {
    delay: Duration,
}

impl SlowResponder {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Responder for SlowResponder {
    async fn respond(&self, _ctx: &TurnContext<'_>) -> Result<String, ResponderError> {
        tokio::time::sleep(self.delay).await;
        Ok("too late".to_string())
    }
}

/// Participants with the given ids, each repeating its own name
pub fn participants(ids: &[&str]) -> Vec<Participant> {
    ids.iter()
        .map(|id| {
            Participant::new(
                *id,
                format!("{id} role"),
                Arc::new(ScriptedResponder::repeating(format!("{id} speaking"))),
            )
        })
        .collect()
}

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Mock search
// ============================================================================

/// Search that always returns the same digest
pub struct StaticSearch {
    digest: String,
    /// Queries received
    pub queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn new(digest: &str) -> Self {
        Self {
            digest: digest.to_string(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchService for StaticSearch {
    async fn search(&self, query: &str) -> Result<String, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.digest.clone())
    }
}

/// Search that always fails with one kind
pub struct FailingSearch {
    kind: ErrorKind,
}

impl FailingSearch {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl SearchService for FailingSearch {
    async fn search(&self, _query: &str) -> Result<String, SearchError> {
        Err(SearchError::new(self.kind, format!("search {}", self.kind)))
    }
}
