//! Units of work handed to a participant for one turn

use super::ParticipantId;
use crate::prompt::interpolate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A piece of work owned by one participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub participant: ParticipantId,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
}

impl Task {
    pub fn new(participant: impl Into<ParticipantId>, description: impl Into<String>) -> Self {
        Self {
            participant: participant.into(),
            description: description.into(),
            expected_output: None,
        }
    }

    #[must_use]
    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }

    /// Fill `{name}` placeholders from kickoff inputs
    #[must_use]
    pub fn interpolate(&self, inputs: &HashMap<String, String>) -> Self {
        Self {
            participant: self.participant.clone(),
            description: interpolate(&self.description, inputs),
            expected_output: self
                .expected_output
                .as_deref()
                .map(|e| interpolate(e, inputs)),
        }
    }
}

/// Who speaks this turn, and on what
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnAssignment {
    pub speaker: ParticipantId,
    pub task: Option<Task>,
}

impl TurnAssignment {
    pub fn speaker(speaker: ParticipantId) -> Self {
        Self {
            speaker,
            task: None,
        }
    }

    pub fn with_task(task: Task) -> Self {
        Self {
            speaker: task.participant.clone(),
            task: Some(task),
        }
    }
}
