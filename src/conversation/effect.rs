//! Effects produced by loop transitions

use super::{ParticipantId, TerminalReason, TurnAssignment};
use std::time::Duration;

/// Work for the loop to carry out after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the selector for the next speaker (checks cancellation first)
    SelectSpeaker,

    /// Ask the assigned participant for one message
    RequestResponse {
        assignment: TurnAssignment,
        attempt: u32,
    },

    /// Wait, then re-request the same turn
    ScheduleRetry {
        delay: Duration,
        speaker: ParticipantId,
        attempt: u32,
        error: String,
    },

    /// Append to the transcript and evaluate stop predicates.
    /// `selected` is false for the opening message.
    AppendMessage {
        speaker: ParticipantId,
        content: String,
        selected: bool,
    },

    /// Mark the state terminated and publish the outcome
    Finish { reason: TerminalReason },
}
