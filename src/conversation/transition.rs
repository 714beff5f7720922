//! Pure loop transition function
//!
//! `transition` performs no I/O. Given the same phase, context and event it
//! always yields the same phase and effects.

use super::{Effect, Event, LoopContext, LoopPhase, StateError, TerminalReason};
use crate::config::MAX_RETRY_AFTER;
use std::time::Duration;
use thiserror::Error;

/// Cap on the back-off exponent
const MAX_BACKOFF_SHIFT: u32 = 6;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: LoopPhase,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: LoopPhase) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    fn finish(reason: TerminalReason) -> Self {
        Self::new(LoopPhase::Terminated {
            reason: reason.clone(),
        })
        .with_effect(Effect::Finish { reason })
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Conversation already terminated")]
    AlreadyTerminated,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error(transparent)]
    State(#[from] StateError),
}

pub fn transition(
    state: &LoopPhase,
    context: &LoopContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        (LoopPhase::Terminated { .. }, _) => Err(TransitionError::AlreadyTerminated),

        // ============================================================
        // Start
        // ============================================================
        (LoopPhase::Idle, Event::Begin) => {
            Ok(TransitionResult::new(LoopPhase::Idle).with_effect(Effect::SelectSpeaker))
        }

        (LoopPhase::Idle, Event::Opened { sender, content }) => {
            Ok(
                TransitionResult::new(LoopPhase::Appending { assignment: None }).with_effect(
                    Effect::AppendMessage {
                        speaker: sender,
                        content,
                        selected: false,
                    },
                ),
            )
        }

        // ============================================================
        // Selection
        // ============================================================
        (LoopPhase::Idle, Event::SpeakerSelected { assignment }) => Ok(TransitionResult::new(
            LoopPhase::AwaitingResponse {
                assignment: assignment.clone(),
                attempt: 1,
            },
        )
        .with_effect(Effect::RequestResponse {
            assignment,
            attempt: 1,
        })),

        (LoopPhase::Idle, Event::PipelineExhausted) => {
            Ok(TransitionResult::finish(TerminalReason::PipelineComplete))
        }

        (LoopPhase::Idle, Event::SelectionFailed { message }) => {
            Ok(TransitionResult::finish(TerminalReason::SelectionError { message }))
        }

        (LoopPhase::Idle, Event::Cancelled) => Ok(TransitionResult::finish(TerminalReason::Cancelled)),

        // Only reachable while waiting out a retry back-off; nothing is in flight
        (LoopPhase::AwaitingResponse { attempt, .. }, Event::Cancelled) if *attempt > 1 => {
            Ok(TransitionResult::finish(TerminalReason::Cancelled))
        }

        // ============================================================
        // Responses and retry
        // ============================================================
        (LoopPhase::AwaitingResponse { assignment, .. }, Event::ResponseReceived { content }) => {
            Ok(TransitionResult::new(LoopPhase::Appending {
                assignment: Some(assignment.clone()),
            })
            .with_effect(Effect::AppendMessage {
                speaker: assignment.speaker.clone(),
                content,
                selected: true,
            }))
        }

        (LoopPhase::AwaitingResponse { assignment, attempt }, Event::ResponderFailed { error })
            if error.is_retryable() && *attempt <= context.retry_budget =>
        {
            let next = attempt + 1;
            let delay = retry_delay(context.retry_base_delay, *attempt, error.retry_after);
            Ok(TransitionResult::new(LoopPhase::AwaitingResponse {
                assignment: assignment.clone(),
                attempt: next,
            })
            .with_effect(Effect::ScheduleRetry {
                delay,
                speaker: assignment.speaker.clone(),
                attempt: next,
                error: error.to_string(),
            }))
        }

        (LoopPhase::AwaitingResponse { assignment, attempt }, Event::ResponderFailed { error }) => {
            Ok(TransitionResult::finish(TerminalReason::ResponderError {
                speaker: assignment.speaker.clone(),
                kind: error.kind,
                message: error.message,
                attempts: *attempt,
            }))
        }

        (LoopPhase::AwaitingResponse { assignment, attempt }, Event::RetryElapsed { attempt: due })
            if *attempt == due =>
        {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::RequestResponse {
                assignment: assignment.clone(),
                attempt: due,
            }))
        }

        // ============================================================
        // After append: stop predicate > pipeline complete > max turns
        // ============================================================
        (
            LoopPhase::Appending { .. },
            Event::MessageAppended {
                turn_count,
                stop_fired_by,
                exhausted,
            },
        ) => {
            if let Some(participant) = stop_fired_by {
                Ok(TransitionResult::finish(TerminalReason::StopPredicate { participant }))
            } else if exhausted {
                Ok(TransitionResult::finish(TerminalReason::PipelineComplete))
            } else if turn_count >= context.max_turns {
                Ok(TransitionResult::finish(TerminalReason::MaxTurnsReached))
            } else {
                Ok(TransitionResult::new(LoopPhase::Idle).with_effect(Effect::SelectSpeaker))
            }
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{event:?} not valid in phase {}",
            state.name()
        ))),
    }
}

/// Exponential back-off from `base`, doubled per failed attempt, never
/// shorter than the provider's requested wait. The requested wait is
/// clamped to `MAX_RETRY_AFTER`.
fn retry_delay(base: Duration, failed_attempt: u32, retry_after: Option<Duration>) -> Duration {
    let shift = failed_attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
    let backoff = base.saturating_mul(1 << shift);
    retry_after.map_or(backoff, |after| backoff.max(after.min(MAX_RETRY_AFTER)))
}
