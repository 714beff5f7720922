//! Events driving the turn loop, and the notifications it publishes

use super::{Message, ParticipantId, ResponderError, TerminalReason, TurnAssignment};
use serde::Serialize;
use std::time::Duration;

/// Inputs to the pure transition function
#[derive(Debug, Clone)]
pub enum Event {
    /// Loop started without an opening message
    Begin,
    /// Loop started with an opening message that counts as turn 1
    Opened {
        sender: ParticipantId,
        content: String,
    },

    // Selection outcomes
    SpeakerSelected { assignment: TurnAssignment },
    PipelineExhausted,
    SelectionFailed { message: String },

    // Responder outcomes
    ResponseReceived { content: String },
    ResponderFailed { error: ResponderError },
    RetryElapsed { attempt: u32 },

    /// A message was appended and evaluated
    MessageAppended {
        turn_count: u32,
        /// First participant whose stop predicate fired on the message
        stop_fired_by: Option<ParticipantId>,
        /// Selector reports no stages left
        exhausted: bool,
    },

    /// Cancellation observed between turns
    Cancelled,
}

/// Progress notifications for observers. Observers never influence the loop.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    TurnStarted {
        conversation_id: String,
        speaker: ParticipantId,
        turn: u32,
    },
    Message {
        conversation_id: String,
        message: Message,
    },
    Retrying {
        conversation_id: String,
        speaker: ParticipantId,
        attempt: u32,
        #[serde(with = "duration_ms")]
        delay: Duration,
        error: String,
    },
    Finished {
        conversation_id: String,
        reason: TerminalReason,
        turn_count: u32,
    },
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    #[allow(clippy::trivially_copy_pass_by_ref)] // serde's `with` signature
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}
