//! Bounded multi-agent turn-taking
//!
//! A conversation is a fixed set of [`Participant`]s, a [`SpeakerSelector`]
//! deciding who talks next, and a [`TurnLoop`] that drives the exchange
//! until a stop predicate fires, a pipeline runs out of stages, the turn cap
//! is hit, or something fails.
//!
//! The loop follows the same shape throughout: a pure [`transition`]
//! function maps `(phase, event)` to a new phase plus [`Effect`]s, and the
//! loop executes those effects, feeding the resulting events back in.

mod effect;
pub mod event;
mod message;
mod participant;
pub mod selector;
pub mod state;
mod task;
pub(crate) mod transition;
mod turn_loop;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub mod testing;

pub use effect::Effect;
pub use event::{ConversationEvent, Event};
pub use message::{Message, ParticipantId};
pub use participant::{Participant, Responder, ResponderError, StopPredicate, TurnContext};
pub use selector::{
    FixedPipeline, ModeratedSelector, RoundRobin, Selection, SelectionError, SpeakerSelector,
};
pub use state::{ConversationState, LoopContext, LoopPhase, StateError, TerminalReason};
pub use task::{Task, TurnAssignment};
pub use transition::{transition, TransitionError};
pub use turn_loop::{ConversationOutcome, LoopConfig, Opening, TurnLoop};
