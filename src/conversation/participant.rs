//! Participants and the responder seam

use super::{Message, ParticipantId, Task};
use crate::error::ErrorKind;
use crate::llm::LlmError;
use crate::search::SearchError;
use crate::tools::{Tool, ToolRegistry};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// A participant failed to produce its message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ResponderError {
    pub kind: ErrorKind,
    pub message: String,
    /// Provider-suggested wait before retrying
    pub retry_after: Option<Duration>,
}

impl ResponderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("no response within {}s", after.as_secs_f64()),
        )
    }

    pub fn empty_response() -> Self {
        Self::new(ErrorKind::EmptyResponse, "participant produced an empty message")
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<LlmError> for ResponderError {
    fn from(e: LlmError) -> Self {
        Self {
            kind: e.kind,
            message: e.message,
            retry_after: e.retry_after,
        }
    }
}

impl From<SearchError> for ResponderError {
    fn from(e: SearchError) -> Self {
        Self::new(e.kind, e.message)
    }
}

/// Everything a responder may look at while producing one message
pub struct TurnContext<'a> {
    pub conversation_id: &'a str,
    pub speaker: &'a ParticipantId,
    pub transcript: &'a [Message],
    pub task: Option<&'a Task>,
    /// 1 on the first try, incremented on each retry
    pub attempt: u32,
    pub capabilities: &'a ToolRegistry,
    pub cancel: &'a CancellationToken,
}

/// Produces exactly one message per call, or fails
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, ctx: &TurnContext<'_>) -> Result<String, ResponderError>;
}

#[async_trait]
impl<T: Responder + ?Sized> Responder for Arc<T> {
    async fn respond(&self, ctx: &TurnContext<'_>) -> Result<String, ResponderError> {
        (**self).respond(ctx).await
    }
}

/// Pure check over a message's content that ends the conversation.
///
/// Fires when the content ends with the token once trailing whitespace is
/// trimmed. Case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopPredicate {
    token: String,
}

impl StopPredicate {
    pub fn ends_with(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn fires(&self, content: &str) -> bool {
        content.trim_end().ends_with(self.token.as_str())
    }
}

/// A named member of the conversation. Built at setup and never mutated.
#[derive(Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub role: String,
    pub responder: Arc<dyn Responder>,
    pub capabilities: ToolRegistry,
    pub stop: Option<StopPredicate>,
}

impl Participant {
    pub fn new(
        id: impl Into<ParticipantId>,
        role: impl Into<String>,
        responder: Arc<dyn Responder>,
    ) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            responder,
            capabilities: ToolRegistry::default(),
            stop: None,
        }
    }

    #[must_use]
    pub fn with_capabilities(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.capabilities = ToolRegistry::new(tools);
        self
    }

    #[must_use]
    pub fn with_stop(mut self, stop: StopPredicate) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn should_stop(&self, content: &str) -> bool {
        self.stop.as_ref().is_some_and(|s| s.fires(content))
    }
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("capabilities", &self.capabilities)
            .field("stop", &self.stop)
            .finish_non_exhaustive()
    }
}
