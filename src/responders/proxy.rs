//! Fixed auto-reply participant

use crate::conversation::{Responder, ResponderError, TurnContext};
use async_trait::async_trait;

pub const DEFAULT_AUTO_REPLY: &str = "Continue.";

/// Participant that never calls a model and answers every turn with the
/// same auto-reply
#[derive(Debug, Clone)]
pub struct ProxyResponder {
    auto_reply: String,
}

impl ProxyResponder {
    pub fn new(auto_reply: impl Into<String>) -> Self {
        Self {
            auto_reply: auto_reply.into(),
        }
    }
}

impl Default for ProxyResponder {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_REPLY)
    }
}

#[async_trait]
impl Responder for ProxyResponder {
    async fn respond(&self, ctx: &TurnContext<'_>) -> Result<String, ResponderError> {
        tracing::debug!(conv_id = %ctx.conversation_id, speaker = %ctx.speaker, "Proxy auto-reply");
        Ok(self.auto_reply.clone())
    }
}
