//! Planner then writer: a two-stage content pipeline over a topic

use super::{Collaborators, Scenario};
use crate::config::ConfigError;
use crate::conversation::{FixedPipeline, LoopConfig, Participant, Task, TurnLoop};
use crate::prompt::Persona;
use crate::responders::LlmResponder;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_TOPIC: &str = "Large Language Models";

pub fn planner() -> Persona {
    Persona::new(
        "Content Planner",
        "Agent is able to plan an engaging and factually correct content on {topic}",
        "You have to plan a linkedin post on the: {topic}. Your job is to collect information that is simple for audience and your work is going to be the basis for writer agent for writing the post.",
    )
}

pub fn writer() -> Persona {
    Persona::new(
        "Content Writer",
        "Agent is able to write a post about the topic: {topic}",
        "You have to write a linkedin post on the: {topic}. Your writing is based on the work of content planner agent, which provides you the outline.",
    )
}

pub fn tasks() -> Vec<Task> {
    vec![
        Task::new(
            "Content Planner",
            "1. Get the information on the topic: {topic}\n2. Plan a proper content around the topic",
        )
        .with_expected_output("A content plan based on proper information"),
        Task::new(
            "Content Writer",
            "1. Use the content plan to craft a linkedin post on the topic: {topic}",
        )
        .with_expected_output("A good written post on the topic"),
    ]
}

/// Kick off the crew for `topic`. The result is the writer's message.
pub fn build(collab: &Collaborators, topic: &str) -> Result<Scenario, ConfigError> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(ConfigError::Setup("topic must not be empty".to_string()));
    }
    let inputs = HashMap::from([("topic".to_string(), topic.to_string())]);

    let participants: Vec<Participant> = [planner(), writer()]
        .iter()
        .map(|persona| {
            let persona = persona.interpolate(&inputs);
            Participant::new(
                persona.role.clone(),
                persona.goal.clone(),
                Arc::new(LlmResponder::from_persona(
                    collab.llm.clone(),
                    &persona,
                    collab.max_completion_tokens,
                )),
            )
        })
        .collect();

    let stages: Vec<Task> = tasks().iter().map(|t| t.interpolate(&inputs)).collect();
    let max_turns = u32::try_from(stages.len())
        .map_err(|_| ConfigError::Setup("too many stages".to_string()))?;
    let config = LoopConfig::from_defaults(max_turns, collab.loop_defaults);

    Ok(Scenario {
        turn_loop: TurnLoop::new(participants, FixedPipeline::new(stages), config)?,
        opening: None,
    })
}
