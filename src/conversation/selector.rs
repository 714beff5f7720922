//! Speaker selection policies

use super::{ConversationState, Message, Participant, ParticipantId, Task, TurnAssignment};
use crate::config::ConfigError;
use crate::llm::{LlmMessage, LlmRequest, LlmService, SystemContent};
use crate::prompt::render_transcript;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Outcome of asking a selector for the next turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Speaker(TurnAssignment),
    /// No stages left
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no eligible speaker")]
    NoEligibleSpeaker,
    #[error("stage participant {0} is not in the conversation")]
    UnknownParticipant(ParticipantId),
}

/// Decides who speaks next
#[async_trait]
pub trait SpeakerSelector: Send + Sync {
    /// Short policy name for logs
    fn name(&self) -> &'static str;

    /// Reject setups this policy can never serve
    fn validate(&self, participants: &[Participant]) -> Result<(), ConfigError> {
        if participants.is_empty() {
            return Err(ConfigError::Setup("no participants".to_string()));
        }
        Ok(())
    }

    async fn select(
        &mut self,
        state: &ConversationState,
        participants: &[Participant],
    ) -> Result<Selection, SelectionError>;

    /// Called with every message produced by a selected speaker
    fn observe(&mut self, _message: &Message) {}

    /// True once there is nothing left to assign
    fn is_exhausted(&self) -> bool {
        false
    }
}

// ============================================================================
// Round-robin
// ============================================================================

/// Fixed order, starting after the last speaker
#[derive(Debug, Clone, Copy)]
pub struct RoundRobin {
    allow_repeat: bool,
}

impl RoundRobin {
    pub fn new(allow_repeat: bool) -> Self {
        Self { allow_repeat }
    }

    /// The AutoGen group-chat default
    pub fn without_repeat() -> Self {
        Self::new(false)
    }

    fn pick(
        self,
        last: Option<&ParticipantId>,
        participants: &[Participant],
    ) -> Result<ParticipantId, SelectionError> {
        if participants.is_empty() {
            return Err(SelectionError::NoEligibleSpeaker);
        }

        let last_index = last.and_then(|id| participants.iter().position(|p| &p.id == id));
        let next = match last_index {
            Some(i) => (i + 1) % participants.len(),
            None => 0,
        };

        if !self.allow_repeat && Some(next) == last_index {
            return Err(SelectionError::NoEligibleSpeaker);
        }
        Ok(participants[next].id.clone())
    }
}

#[async_trait]
impl SpeakerSelector for RoundRobin {
    fn name(&self) -> &'static str {
        "round_robin"
    }

    async fn select(
        &mut self,
        state: &ConversationState,
        participants: &[Participant],
    ) -> Result<Selection, SelectionError> {
        self.pick(state.last_speaker(), participants)
            .map(|id| Selection::Speaker(TurnAssignment::speaker(id)))
    }
}

// ============================================================================
// Fixed pipeline
// ============================================================================

/// Ordered stages, one task each, advanced once per completed task
#[derive(Debug, Clone)]
pub struct FixedPipeline {
    stages: Vec<Task>,
    completed: usize,
}

impl FixedPipeline {
    pub fn new(stages: Vec<Task>) -> Self {
        Self {
            stages,
            completed: 0,
        }
    }

    /// One participant, one task, no delegation
    pub fn single_responder(task: Task) -> Self {
        Self::new(vec![task])
    }

    #[cfg(test)]
    pub fn completed(&self) -> usize {
        self.completed
    }
}

#[async_trait]
impl SpeakerSelector for FixedPipeline {
    fn name(&self) -> &'static str {
        "fixed_pipeline"
    }

    fn validate(&self, participants: &[Participant]) -> Result<(), ConfigError> {
        if participants.is_empty() {
            return Err(ConfigError::Setup("no participants".to_string()));
        }
        if self.stages.is_empty() {
            return Err(ConfigError::Setup("pipeline has no stages".to_string()));
        }
        for task in &self.stages {
            if !participants.iter().any(|p| p.id == task.participant) {
                return Err(ConfigError::Setup(format!(
                    "stage participant {} is not in the conversation",
                    task.participant
                )));
            }
        }
        Ok(())
    }

    async fn select(
        &mut self,
        _state: &ConversationState,
        participants: &[Participant],
    ) -> Result<Selection, SelectionError> {
        let Some(task) = self.stages.get(self.completed) else {
            return Ok(Selection::Exhausted);
        };
        if !participants.iter().any(|p| p.id == task.participant) {
            return Err(SelectionError::UnknownParticipant(task.participant.clone()));
        }
        Ok(Selection::Speaker(TurnAssignment::with_task(task.clone())))
    }

    fn observe(&mut self, message: &Message) {
        if self
            .stages
            .get(self.completed)
            .is_some_and(|task| task.participant == message.sender)
        {
            self.completed += 1;
        }
    }

    fn is_exhausted(&self) -> bool {
        self.completed >= self.stages.len()
    }
}

// ============================================================================
// LLM-moderated
// ============================================================================

/// Group-chat manager: asks a model to name the next speaker.
///
/// Falls back to round-robin when the model fails or names nobody eligible.
pub struct ModeratedSelector {
    llm: Arc<dyn LlmService>,
    system_prompt: String,
    allow_repeat: bool,
    max_tokens: u32,
}

impl ModeratedSelector {
    pub fn new(llm: Arc<dyn LlmService>, system_prompt: impl Into<String>, allow_repeat: bool) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
            allow_repeat,
            max_tokens: 32,
        }
    }

    fn build_request(&self, state: &ConversationState, eligible: &[&Participant]) -> LlmRequest {
        let roles = eligible
            .iter()
            .map(|p| format!("{}: {}", p.id, p.role))
            .collect::<Vec<_>>()
            .join("\n");
        let names = eligible
            .iter()
            .map(|p| p.id.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let system = format!(
            "{}\n\nYou are in a role play game. The following roles are available:\n{roles}",
            self.system_prompt
        );
        let user = format!(
            "{}\n\nRead the above conversation. Then select the next role from [{names}] to play. Only return the role.",
            render_transcript(state.transcript())
        );

        LlmRequest {
            system: vec![SystemContent::new(system)],
            messages: vec![LlmMessage::user(user)],
            tools: vec![],
            max_tokens: Some(self.max_tokens),
        }
    }
}

/// Find the eligible participant a reply names: exact match first, then the
/// single name mentioned in the text
fn parse_choice<'a>(reply: &str, eligible: &[&'a Participant]) -> Option<&'a Participant> {
    let reply = reply.trim().trim_matches(|c: char| c == '"' || c == '\'' || c == '.');
    if let Some(p) = eligible.iter().copied().find(|p| p.id.as_str() == reply) {
        return Some(p);
    }
    let mentioned: Vec<&Participant> = eligible
        .iter()
        .copied()
        .filter(|p| reply.contains(p.id.as_str()))
        .collect();
    match mentioned.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

#[async_trait]
impl SpeakerSelector for ModeratedSelector {
    fn name(&self) -> &'static str {
        "moderated"
    }

    async fn select(
        &mut self,
        state: &ConversationState,
        participants: &[Participant],
    ) -> Result<Selection, SelectionError> {
        let last = state.last_speaker();
        let eligible: Vec<&Participant> = participants
            .iter()
            .filter(|p| self.allow_repeat || Some(&p.id) != last)
            .collect();

        match eligible.as_slice() {
            [] => return Err(SelectionError::NoEligibleSpeaker),
            [only] => return Ok(Selection::Speaker(TurnAssignment::speaker(only.id.clone()))),
            _ => {}
        }

        let request = self.build_request(state, &eligible);
        let choice = match self.llm.complete(&request).await {
            Ok(response) => {
                let reply = response.text();
                let choice = parse_choice(&reply, &eligible);
                if choice.is_none() {
                    tracing::warn!(reply = %reply, "Moderator named no eligible speaker, using round-robin");
                }
                choice
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = %e.kind, "Moderator request failed, using round-robin");
                None
            }
        };

        match choice {
            Some(p) => Ok(Selection::Speaker(TurnAssignment::speaker(p.id.clone()))),
            None => RoundRobin::new(self.allow_repeat)
                .pick(last, participants)
                .map(|id| Selection::Speaker(TurnAssignment::speaker(id))),
        }
    }
}

/// Participant ids must be unique within a conversation
pub(crate) fn check_unique_ids(participants: &[Participant]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for p in participants {
        if !seen.insert(&p.id) {
            return Err(ConfigError::Setup(format!("duplicate participant {}", p.id)));
        }
    }
    Ok(())
}
