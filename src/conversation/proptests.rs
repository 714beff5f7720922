//! Property-based tests for the turn loop
//!
//! These drive whole conversations with scripted responders and check the
//! loop's guarantees hold for any roster size, turn cap and script.

use super::testing::{participants, ScriptedResponder};
use super::transition::transition;
use super::*;
use crate::error::ErrorKind;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

fn run(turn_loop: TurnLoop, opening: Option<Opening>) -> ConversationOutcome {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
        .block_on(turn_loop.run(opening))
        .unwrap()
}

fn config(max_turns: u32) -> LoopConfig {
    LoopConfig::new(max_turns)
        .with_retry_budget(0)
        .with_retry_base_delay(Duration::ZERO)
}

fn names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("Agent{i}")).collect()
}

fn roster(count: usize) -> Vec<Participant> {
    let names = names(count);
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    participants(&refs)
}

fn test_context(max_turns: u32, retry_budget: u32) -> LoopContext {
    LoopContext {
        conversation_id: "prop-conv".to_string(),
        max_turns,
        retry_budget,
        retry_base_delay: Duration::from_millis(10),
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_error_kind() -> impl Strategy<Value = ErrorKind> {
    prop_oneof![
        Just(ErrorKind::Network),
        Just(ErrorKind::RateLimit),
        Just(ErrorKind::ServerError),
        Just(ErrorKind::Timeout),
        Just(ErrorKind::EmptyResponse),
        Just(ErrorKind::Auth),
        Just(ErrorKind::InvalidRequest),
        Just(ErrorKind::Unknown),
    ]
}

fn arb_fatal_kind() -> impl Strategy<Value = ErrorKind> {
    prop_oneof![
        Just(ErrorKind::Auth),
        Just(ErrorKind::InvalidRequest),
        Just(ErrorKind::Unknown),
    ]
}

fn arb_assignment() -> impl Strategy<Value = TurnAssignment> {
    "[A-Z][a-z]{2,8}".prop_map(|name| TurnAssignment::speaker(ParticipantId::new(name)))
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::Begin),
        "[a-z ]{1,20}".prop_map(|content| Event::Opened {
            sender: ParticipantId::new("user"),
            content
        }),
        arb_assignment().prop_map(|assignment| Event::SpeakerSelected { assignment }),
        Just(Event::PipelineExhausted),
        "[a-z ]{1,20}".prop_map(|content| Event::ResponseReceived { content }),
        arb_error_kind().prop_map(|kind| Event::ResponderFailed {
            error: ResponderError::new(kind, "boom")
        }),
        (1u32..5).prop_map(|attempt| Event::RetryElapsed { attempt }),
        (1u32..10, any::<bool>()).prop_map(|(turn_count, exhausted)| Event::MessageAppended {
            turn_count,
            stop_fired_by: None,
            exhausted
        }),
        Just(Event::Cancelled),
    ]
}

// ============================================================================
// Transition properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Once terminated, every event is rejected
    #[test]
    fn prop_terminated_is_absorbing(events in proptest::collection::vec(arb_event(), 1..30)) {
        let ctx = test_context(5, 2);
        let mut phase = LoopPhase::Idle;
        for event in events {
            let result = transition(&phase, &ctx, event);
            if phase.is_terminal() {
                prop_assert!(result.is_err());
            } else if let Ok(result) = result {
                phase = result.new_state;
            }
        }
    }

    /// Entering the terminal phase always emits exactly one Finish
    #[test]
    fn prop_termination_emits_finish(events in proptest::collection::vec(arb_event(), 1..30)) {
        let ctx = test_context(5, 2);
        let mut phase = LoopPhase::Idle;
        for event in events {
            if let Ok(result) = transition(&phase, &ctx, event) {
                let finishes = result
                    .effects
                    .iter()
                    .filter(|e| matches!(e, Effect::Finish { .. }))
                    .count();
                if result.new_state.is_terminal() {
                    prop_assert_eq!(finishes, 1);
                } else {
                    prop_assert_eq!(finishes, 0);
                }
                phase = result.new_state;
            }
        }
    }

    /// Non-retryable failures terminate immediately regardless of budget
    #[test]
    fn prop_non_retryable_never_retried(
        kind in arb_fatal_kind(),
        budget in 0u32..5,
        assignment in arb_assignment(),
    ) {
        let phase = LoopPhase::AwaitingResponse { assignment, attempt: 1 };
        let result = transition(
            &phase,
            &test_context(5, budget),
            Event::ResponderFailed { error: ResponderError::new(kind, "x") },
        ).unwrap();
        let is_responder_error = matches!(
            result.new_state,
            LoopPhase::Terminated { reason: TerminalReason::ResponderError { .. } }
        );
        prop_assert!(is_responder_error);
    }

    /// A retryable failure is retried exactly `budget` times
    #[test]
    fn prop_retry_budget_respected(budget in 0u32..6, assignment in arb_assignment()) {
        let ctx = test_context(5, budget);
        let mut phase = LoopPhase::AwaitingResponse { assignment, attempt: 1 };
        let mut retries = 0;
        loop {
            let failed = transition(
                &phase,
                &ctx,
                Event::ResponderFailed { error: ResponderError::new(ErrorKind::Network, "down") },
            ).unwrap();
            match &failed.new_state {
                LoopPhase::AwaitingResponse { attempt, .. } => {
                    retries += 1;
                    phase = transition(&failed.new_state, &ctx, Event::RetryElapsed { attempt: *attempt })
                        .unwrap()
                        .new_state;
                }
                LoopPhase::Terminated { reason } => {
                    let attempts_ok = matches!(
                        reason,
                        TerminalReason::ResponderError { attempts, .. } if *attempts == budget + 1
                    );
                    prop_assert!(attempts_ok);
                    break;
                }
                other => prop_assert!(false, "unexpected phase {other:?}"),
            }
        }
        prop_assert_eq!(retries, budget);
    }
}

// ============================================================================
// Whole-loop properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Round-robin never exceeds the cap, keeps orders dense, and never
    /// lets anyone speak twice in a row
    #[test]
    fn prop_round_robin_bounded_and_alternating(count in 2usize..6, max_turns in 1u32..15) {
        let turn_loop = TurnLoop::new(roster(count), RoundRobin::without_repeat(), config(max_turns)).unwrap();
        let outcome = run(turn_loop, None);

        prop_assert_eq!(&outcome.reason, &TerminalReason::MaxTurnsReached);
        prop_assert_eq!(outcome.turn_count, max_turns);
        prop_assert_eq!(outcome.transcript.len(), max_turns as usize);
        for (i, m) in outcome.transcript.iter().enumerate() {
            prop_assert_eq!(m.order as usize, i + 1);
        }
        for pair in outcome.transcript.windows(2) {
            prop_assert_ne!(&pair[0].sender, &pair[1].sender);
        }
    }

    /// Pipeline stages are run once each, in order, and never revisited
    #[test]
    fn prop_pipeline_runs_each_stage_once(count in 1usize..6, slack in 0u32..5) {
        let names = names(count);
        let stages: Vec<Task> = names.iter().map(|n| Task::new(n.as_str(), format!("work of {n}"))).collect();
        let max_turns = u32::try_from(count).unwrap() + slack;

        let turn_loop = TurnLoop::new(roster(count), FixedPipeline::new(stages), config(max_turns)).unwrap();
        let outcome = run(turn_loop, None);

        prop_assert_eq!(&outcome.reason, &TerminalReason::PipelineComplete);
        let speakers: Vec<String> = outcome.transcript.iter().map(|m| m.sender.to_string()).collect();
        prop_assert_eq!(speakers, names);
    }

    /// A stop predicate firing on turn k ends the loop at exactly k
    #[test]
    fn prop_stop_predicate_ends_at_firing_turn(count in 2usize..5, stop_at in 1u32..12, slack in 0u32..5) {
        let max_turns = stop_at + slack;
        let script: Vec<String> = (1..=max_turns)
            .map(|turn| if turn == stop_at { "done TERMINATE".to_string() } else { format!("turn {turn}") })
            .collect();
        let shared = Arc::new(ScriptedResponder::new(script));
        let roster: Vec<Participant> = names(count)
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let p = Participant::new(name, "agent", shared.clone());
                if i == 0 { p.with_stop(StopPredicate::ends_with("TERMINATE")) } else { p }
            })
            .collect();

        let turn_loop = TurnLoop::new(roster, RoundRobin::without_repeat(), config(max_turns)).unwrap();
        let outcome = run(turn_loop, None);

        let stopped = matches!(outcome.reason, TerminalReason::StopPredicate { .. });
        prop_assert!(stopped);
        prop_assert_eq!(outcome.turn_count, stop_at);
    }

    /// A responder failure never adds to the transcript
    #[test]
    fn prop_failed_turn_appends_nothing(ok_turns in 0u32..5, kind in arb_error_kind()) {
        let mut script: Vec<Result<String, ResponderError>> =
            (0..ok_turns).map(|i| Ok(format!("reply {i}"))).collect();
        script.push(Err(ResponderError::new(kind, "boom")));
        let roster = vec![
            Participant::new("A", "agent", Arc::new(ScriptedResponder::from_results(script))),
        ];

        let turn_loop = TurnLoop::new(roster, RoundRobin::new(true), config(20)).unwrap();
        let outcome = run(turn_loop, None);

        let failed = matches!(outcome.reason, TerminalReason::ResponderError { .. });
        prop_assert!(failed);
        prop_assert_eq!(outcome.turn_count, ok_turns);
        prop_assert_eq!(outcome.transcript.len(), ok_turns as usize);
    }
}
