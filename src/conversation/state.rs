//! Conversation state and loop phases

use super::{Message, ParticipantId, TurnAssignment};
use crate::error::ErrorKind;
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Transcript plus bookkeeping, owned exclusively by the turn loop.
///
/// `transcript.len() == turn_count` at all times; once `terminated` is set
/// nothing more can be appended.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    transcript: Vec<Message>,
    turn_count: u32,
    last_speaker: Option<ParticipantId>,
    terminated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("conversation already terminated")]
    Terminated,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept one message as the next turn and hand back a copy of it
    pub fn append(
        &mut self,
        sender: ParticipantId,
        content: String,
    ) -> Result<Message, StateError> {
        if self.is_terminated() {
            return Err(StateError::Terminated);
        }

        self.turn_count += 1;
        self.last_speaker = Some(sender.clone());
        let message = Message {
            sender,
            content,
            order: self.turn_count,
            timestamp: Utc::now(),
        };
        self.transcript.push(message.clone());
        Ok(message)
    }

    pub fn terminate(&mut self) {
        self.terminated = true;
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn into_transcript(self) -> Vec<Message> {
        self.transcript
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn last_speaker(&self) -> Option<&ParticipantId> {
        self.last_speaker.as_ref()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

/// Why a conversation ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum TerminalReason {
    /// A participant's stop predicate fired on the latest message
    StopPredicate { participant: ParticipantId },
    MaxTurnsReached,
    /// The fixed pipeline ran its last stage
    PipelineComplete,
    ResponderError {
        speaker: ParticipantId,
        kind: ErrorKind,
        message: String,
        attempts: u32,
    },
    SelectionError { message: String },
    Cancelled,
}

impl TerminalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StopPredicate { .. } => "stop-predicate",
            Self::MaxTurnsReached => "max-turns-reached",
            Self::PipelineComplete => "pipeline-complete",
            Self::ResponderError { .. } => "responder-error",
            Self::SelectionError { .. } => "selection-error",
            Self::Cancelled => "cancelled",
        }
    }

    /// Stop predicate, pipeline completion and the turn cap are normal endings
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::StopPredicate { .. } | Self::MaxTurnsReached | Self::PipelineComplete
        )
    }
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StopPredicate { participant } => {
                write!(f, "{} (fired by {participant})", self.as_str())
            }
            Self::ResponderError {
                speaker,
                kind,
                message,
                attempts,
            } => write!(
                f,
                "{} ({speaker} failed with {kind} after {attempts} attempt(s): {message})",
                self.as_str()
            ),
            Self::SelectionError { message } => write!(f, "{} ({message})", self.as_str()),
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Where the loop is within a turn
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoopPhase {
    /// Between turns; the next step is selecting a speaker
    #[default]
    Idle,

    /// Waiting for the selected participant's message
    AwaitingResponse {
        assignment: TurnAssignment,
        attempt: u32,
    },

    /// A message is being appended. `assignment` is `None` for the opening.
    Appending { assignment: Option<TurnAssignment> },

    /// Absorbing: no event is accepted here
    Terminated { reason: TerminalReason },
}

impl LoopPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopPhase::Terminated { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            LoopPhase::Idle => "idle",
            LoopPhase::AwaitingResponse { .. } => "awaiting_response",
            LoopPhase::Appending { .. } => "appending",
            LoopPhase::Terminated { .. } => "terminated",
        }
    }
}

/// Immutable limits the transition function consults
#[derive(Debug, Clone)]
pub struct LoopContext {
    pub conversation_id: String,
    pub max_turns: u32,
    /// Retries allowed per turn after the first attempt
    pub retry_budget: u32,
    pub retry_base_delay: Duration,
}
