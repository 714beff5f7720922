//! Ready-made conversations
//!
//! Each scenario wires participants, a selector and limits into a
//! [`TurnLoop`]. The caller decides how to observe and run it.

pub mod content_crew;
pub mod fact_check;
pub mod group_chat;

use crate::config::LoopDefaults;
use crate::conversation::{
    ConversationEvent, ConversationOutcome, Opening, TransitionError, TurnLoop,
};
use crate::llm::LlmService;
use crate::search::SearchService;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// External services shared by every participant of a scenario
#[derive(Clone)]
pub struct Collaborators {
    pub llm: Arc<dyn LlmService>,
    pub search: Option<Arc<dyn SearchService>>,
    pub max_completion_tokens: u32,
    pub loop_defaults: LoopDefaults,
}

/// A configured conversation that has not started yet
pub struct Scenario {
    pub turn_loop: TurnLoop,
    pub opening: Option<Opening>,
}

impl Scenario {
    #[must_use]
    pub fn with_events(mut self, events: broadcast::Sender<ConversationEvent>) -> Self {
        self.turn_loop = self.turn_loop.with_events(events);
        self
    }

    /// Stop between turns once `cancel` fires
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.turn_loop = self.turn_loop.with_cancel(cancel);
        self
    }

    pub async fn run(self) -> Result<ConversationOutcome, TransitionError> {
        self.turn_loop.run(self.opening).await
    }
}
