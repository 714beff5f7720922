//! A single fact checker with web search

use super::{Collaborators, Scenario};
use crate::config::ConfigError;
use crate::conversation::{FixedPipeline, LoopConfig, Participant, Task, TurnLoop};
use crate::prompt::Persona;
use crate::responders::LlmResponder;
use crate::tools::{Tool, WebSearchTool};
use std::sync::Arc;

pub const ROLE: &str = "Simple Fact Checker";
pub const DEFAULT_QUESTION: &str = "Use the search tool to find the current official world record time for the men's 100-meter sprint.\nYour final answer MUST be only the time and the name of the athlete who holds the record, as a single sentence.";
pub const EXPECTED_OUTPUT: &str = "A single sentence containing the record time and the athlete's name (e.g., The record is 9.58 seconds, held by Usain Bolt).";

pub fn persona() -> Persona {
    Persona::new(
        ROLE,
        "Quickly and accurately retrieve a single, recent factual data point using web search.",
        "A reliable data retrieval bot known for its efficiency and speed in answering specific, single-point queries. Its primary function is to use the search tool to find one definitive answer and report it immediately.",
    )
}

/// Search is required; without it this fails before any turn runs
pub fn build(collab: &Collaborators, question: Option<&str>) -> Result<Scenario, ConfigError> {
    let search = collab
        .search
        .clone()
        .ok_or(ConfigError::Missing("TAVILY_API_KEY"))?;

    let persona = persona();
    let checker = Participant::new(
        ROLE,
        persona.goal.clone(),
        Arc::new(LlmResponder::from_persona(
            collab.llm.clone(),
            &persona,
            collab.max_completion_tokens,
        )),
    )
    .with_capabilities(vec![Arc::new(WebSearchTool::new(search)) as Arc<dyn Tool>]);

    let task = match question.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => Task::new(ROLE, q),
        None => Task::new(ROLE, DEFAULT_QUESTION).with_expected_output(EXPECTED_OUTPUT),
    };
    let config = LoopConfig::from_defaults(1, collab.loop_defaults);

    Ok(Scenario {
        turn_loop: TurnLoop::new(vec![checker], FixedPipeline::single_responder(task), config)?,
        opening: None,
    })
}
