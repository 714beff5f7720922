//! Prompt construction for participants
//!
//! Pure string building: personas, task framing, transcript rendering and
//! `{placeholder}` interpolation of kickoff inputs.

use crate::conversation::{Message, Task};
use std::collections::HashMap;

/// Replace `{name}` placeholders with values from `inputs`.
///
/// Placeholders with no matching input, and braces that do not enclose an
/// identifier, are left exactly as written.
pub fn interpolate(template: &str, inputs: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some((before, after)) = rest.split_once('{') {
        out.push_str(before);
        match after.split_once('}') {
            Some((name, tail)) if is_identifier(name) => {
                match inputs.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = tail;
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Who a crew member is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

impl Persona {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
        }
    }

    #[must_use]
    pub fn interpolate(&self, inputs: &HashMap<String, String>) -> Self {
        Self {
            role: interpolate(&self.role, inputs),
            goal: interpolate(&self.goal, inputs),
            backstory: interpolate(&self.backstory, inputs),
        }
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role,
            self.backstory.trim(),
            self.goal.trim()
        )
    }
}

/// Frame a task as the user message for its turn
pub fn task_prompt(task: &Task) -> String {
    let mut prompt = format!("Current Task: {}", task.description.trim());
    if let Some(expected) = &task.expected_output {
        prompt.push_str("\n\nThis is the expected criteria for your final answer: ");
        prompt.push_str(expected.trim());
        prompt.push_str(
            "\nyou MUST return the actual complete content as the final answer, not a summary.",
        );
    }
    prompt
}

/// Render messages as `Name: content` blocks separated by blank lines
pub fn render_transcript(transcript: &[Message]) -> String {
    transcript
        .iter()
        .map(|m| format!("{}: {}", m.sender, m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}
