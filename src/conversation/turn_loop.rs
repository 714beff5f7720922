//! The conversation driver
//!
//! Strictly sequential: one in-flight response per turn, one message per
//! turn. Cancellation is honored between turns and while waiting out a
//! retry back-off, never while a response is in flight.

use super::selector::check_unique_ids;
use super::{
    transition, ConversationEvent, ConversationState, Effect, Event, LoopContext, LoopPhase,
    Message, Participant, ParticipantId, ResponderError, Selection, SpeakerSelector,
    TerminalReason, TransitionError, TurnAssignment, TurnContext,
};
use crate::config::{ConfigError, LoopDefaults};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Limits for one conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Hard cap on accepted messages, opening included. Must be positive.
    pub max_turns: u32,
    /// Retries per turn for transient failures
    pub retry_budget: u32,
    /// Deadline for a single response; `None` waits indefinitely
    pub response_timeout: Option<Duration>,
    pub retry_base_delay: Duration,
}

impl LoopConfig {
    #[cfg(test)]
    pub fn new(max_turns: u32) -> Self {
        Self::from_defaults(max_turns, LoopDefaults::default())
    }

    pub fn from_defaults(max_turns: u32, defaults: LoopDefaults) -> Self {
        Self {
            max_turns,
            retry_budget: defaults.retry_budget,
            response_timeout: Some(defaults.response_timeout),
            retry_base_delay: Duration::from_secs(1),
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_retry_budget(mut self, retry_budget: u32) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_turns == 0 {
            return Err(ConfigError::Setup("max_turns must be positive".to_string()));
        }
        if self.response_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::Setup(
                "response timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// First message of a conversation, counted as turn 1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opening {
    pub sender: ParticipantId,
    pub content: String,
}

impl Opening {
    pub fn new(sender: impl Into<ParticipantId>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
        }
    }
}

/// Final transcript plus why the loop stopped
#[derive(Debug, Clone)]
pub struct ConversationOutcome {
    pub conversation_id: String,
    pub transcript: Vec<Message>,
    pub turn_count: u32,
    pub reason: TerminalReason,
}

impl ConversationOutcome {
    pub fn last_message(&self) -> Option<&Message> {
        self.transcript.last()
    }

    /// Content of the last message, the result of a pipeline run
    pub fn final_output(&self) -> Option<&str> {
        self.last_message().map(|m| m.content.as_str())
    }
}

pub struct TurnLoop {
    context: LoopContext,
    participants: Vec<Participant>,
    selector: Box<dyn SpeakerSelector>,
    response_timeout: Option<Duration>,
    cancel: CancellationToken,
    events: Option<broadcast::Sender<ConversationEvent>>,
}

impl TurnLoop {
    /// Validate the setup. Nothing runs until [`TurnLoop::run`].
    pub fn new(
        participants: Vec<Participant>,
        selector: impl SpeakerSelector + 'static,
        config: LoopConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        check_unique_ids(&participants)?;
        selector.validate(&participants)?;

        let conversation_id = uuid::Uuid::new_v4().to_string();
        Ok(Self {
            context: LoopContext {
                conversation_id,
                max_turns: config.max_turns,
                retry_budget: config.retry_budget,
                retry_base_delay: config.retry_base_delay,
            },
            participants,
            selector: Box::new(selector),
            response_timeout: config.response_timeout,
            cancel: CancellationToken::new(),
            events: None,
        })
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: broadcast::Sender<ConversationEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn conversation_id(&self) -> &str {
        &self.context.conversation_id
    }

    /// Drive the conversation to a terminal phase
    pub async fn run(
        mut self,
        opening: Option<Opening>,
    ) -> Result<ConversationOutcome, TransitionError> {
        let start = Instant::now();
        tracing::info!(
            conv_id = %self.context.conversation_id,
            participants = self.participants.len(),
            selector = self.selector.name(),
            max_turns = self.context.max_turns,
            "Starting conversation"
        );

        let mut phase = LoopPhase::Idle;
        let mut state = ConversationState::new();
        let mut pending = VecDeque::from([match opening {
            Some(Opening { sender, content }) => Event::Opened { sender, content },
            None => Event::Begin,
        }]);

        while let Some(event) = pending.pop_front() {
            let result = transition(&phase, &self.context, event)?;
            phase = result.new_state;

            for effect in result.effects {
                if let Some(next) = self.execute_effect(effect, &mut state).await? {
                    pending.push_back(next);
                }
            }
        }

        let LoopPhase::Terminated { reason } = phase else {
            return Err(TransitionError::InvalidTransition(format!(
                "loop stalled in phase {}",
                phase.name()
            )));
        };

        tracing::info!(
            conv_id = %self.context.conversation_id,
            reason = reason.as_str(),
            turns = state.turn_count(),
            duration_ms = %start.elapsed().as_millis(),
            "Conversation finished"
        );

        Ok(ConversationOutcome {
            conversation_id: self.context.conversation_id,
            turn_count: state.turn_count(),
            transcript: state.into_transcript(),
            reason,
        })
    }

    async fn execute_effect(
        &mut self,
        effect: Effect,
        state: &mut ConversationState,
    ) -> Result<Option<Event>, TransitionError> {
        match effect {
            Effect::SelectSpeaker => {
                if self.cancel.is_cancelled() {
                    tracing::info!(conv_id = %self.context.conversation_id, "Cancelled between turns");
                    return Ok(Some(Event::Cancelled));
                }
                let event = match self.selector.select(state, &self.participants).await {
                    Ok(Selection::Speaker(assignment)) => Event::SpeakerSelected { assignment },
                    Ok(Selection::Exhausted) => Event::PipelineExhausted,
                    Err(e) => {
                        tracing::error!(conv_id = %self.context.conversation_id, error = %e, "Speaker selection failed");
                        Event::SelectionFailed {
                            message: e.to_string(),
                        }
                    }
                };
                Ok(Some(event))
            }

            Effect::RequestResponse {
                assignment,
                attempt,
            } => {
                if attempt == 1 {
                    self.notify(ConversationEvent::TurnStarted {
                        conversation_id: self.context.conversation_id.clone(),
                        speaker: assignment.speaker.clone(),
                        turn: state.turn_count() + 1,
                    });
                }
                let event = match self.request_response(&assignment, attempt, state).await {
                    Ok(content) => Event::ResponseReceived { content },
                    Err(error) => {
                        tracing::warn!(
                            conv_id = %self.context.conversation_id,
                            speaker = %assignment.speaker,
                            attempt,
                            kind = %error.kind,
                            error = %error.message,
                            retryable = error.is_retryable(),
                            "Responder failed"
                        );
                        Event::ResponderFailed { error }
                    }
                };
                Ok(Some(event))
            }

            Effect::ScheduleRetry {
                delay,
                speaker,
                attempt,
                error,
            } => {
                tracing::info!(
                    conv_id = %self.context.conversation_id,
                    speaker = %speaker,
                    attempt,
                    delay_ms = %delay.as_millis(),
                    "Retrying turn"
                );
                self.notify(ConversationEvent::Retrying {
                    conversation_id: self.context.conversation_id.clone(),
                    speaker,
                    attempt,
                    delay,
                    error,
                });
                tokio::select! {
                    () = tokio::time::sleep(delay) => Ok(Some(Event::RetryElapsed { attempt })),
                    () = self.cancel.cancelled() => {
                        tracing::info!(conv_id = %self.context.conversation_id, "Cancelled during retry back-off");
                        Ok(Some(Event::Cancelled))
                    }
                }
            }

            Effect::AppendMessage {
                speaker,
                content,
                selected,
            } => {
                let message = state.append(speaker, content)?;
                tracing::info!(
                    conv_id = %self.context.conversation_id,
                    turn = message.order,
                    speaker = %message.sender,
                    chars = message.content.len(),
                    "Message appended"
                );

                let stop_fired_by = self
                    .participants
                    .iter()
                    .find(|p| p.should_stop(&message.content))
                    .map(|p| p.id.clone());
                if selected {
                    self.selector.observe(&message);
                }
                let exhausted = self.selector.is_exhausted();
                let turn_count = state.turn_count();

                self.notify(ConversationEvent::Message {
                    conversation_id: self.context.conversation_id.clone(),
                    message,
                });

                Ok(Some(Event::MessageAppended {
                    turn_count,
                    stop_fired_by,
                    exhausted,
                }))
            }

            Effect::Finish { reason } => {
                state.terminate();
                self.notify(ConversationEvent::Finished {
                    conversation_id: self.context.conversation_id.clone(),
                    reason,
                    turn_count: state.turn_count(),
                });
                Ok(None)
            }
        }
    }

    async fn request_response(
        &self,
        assignment: &TurnAssignment,
        attempt: u32,
        state: &ConversationState,
    ) -> Result<String, ResponderError> {
        let Some(participant) = self.participants.iter().find(|p| p.id == assignment.speaker)
        else {
            return Err(ResponderError::new(
                crate::error::ErrorKind::InvalidRequest,
                format!("{} is not a participant", assignment.speaker),
            ));
        };

        let ctx = TurnContext {
            conversation_id: &self.context.conversation_id,
            speaker: &participant.id,
            transcript: state.transcript(),
            task: assignment.task.as_ref(),
            attempt,
            capabilities: &participant.capabilities,
            cancel: &self.cancel,
        };

        let content = match self.response_timeout {
            Some(limit) => tokio::time::timeout(limit, participant.responder.respond(&ctx))
                .await
                .map_err(|_| ResponderError::timeout(limit))??,
            None => participant.responder.respond(&ctx).await?,
        };

        if content.trim().is_empty() {
            return Err(ResponderError::empty_response());
        }
        Ok(content)
    }

    fn notify(&self, event: ConversationEvent) {
        if let Some(tx) = &self.events {
            // No subscribers is fine
            let _ = tx.send(event);
        }
    }
}
