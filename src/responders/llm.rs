//! Model-backed participant

use crate::conversation::{ParticipantId, Responder, ResponderError, TurnContext};
use crate::llm::{
    ContentBlock, LlmMessage, LlmRequest, LlmService, MessageRole, SystemContent,
};
use crate::prompt::{task_prompt, Persona};
use crate::tools::ToolContext;
use async_trait::async_trait;
use std::sync::Arc;

/// Tool round-trips allowed within one turn before a final, tool-less call
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 3;

/// Produces a participant's message with one or more completion calls.
///
/// Capability calls requested by the model run inside the turn; only the
/// final text becomes the message.
pub struct LlmResponder {
    llm: Arc<dyn LlmService>,
    system_prompt: String,
    max_tokens: u32,
    max_tool_rounds: usize,
}

impl LlmResponder {
    pub fn new(llm: Arc<dyn LlmService>, system_prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
            max_tokens,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Responder speaking as a crew persona
    pub fn from_persona(llm: Arc<dyn LlmService>, persona: &Persona, max_tokens: u32) -> Self {
        Self::new(llm, persona.system_prompt(), max_tokens)
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    fn build_messages(ctx: &TurnContext<'_>) -> Vec<LlmMessage> {
        let mut messages: Vec<LlmMessage> = ctx
            .transcript
            .iter()
            .map(|m| {
                if &m.sender == ctx.speaker {
                    LlmMessage::assistant(m.content.clone())
                } else {
                    LlmMessage::user(format!("{}: {}", m.sender, m.content))
                }
            })
            .collect();

        if let Some(task) = ctx.task {
            messages.push(LlmMessage::user(task_prompt(task)));
        } else if !matches!(messages.last(), Some(m) if m.role == MessageRole::User) {
            messages.push(LlmMessage::user(continue_prompt(ctx.speaker)));
        }
        messages
    }

    fn request(&self, messages: &[LlmMessage], ctx: &TurnContext<'_>, with_tools: bool) -> LlmRequest {
        LlmRequest {
            system: vec![SystemContent::new(self.system_prompt.clone())],
            messages: messages.to_vec(),
            tools: if with_tools {
                ctx.capabilities.definitions()
            } else {
                Vec::new()
            },
            max_tokens: Some(self.max_tokens),
        }
    }

    async fn run_tools(&self, content: &[ContentBlock], ctx: &TurnContext<'_>) -> Vec<ContentBlock> {
        let mut results = Vec::new();
        for block in content {
            let ContentBlock::ToolUse { id, name, input } = block else {
                continue;
            };
            let tool_ctx = ToolContext {
                cancel: ctx.cancel.clone(),
                conversation_id: ctx.conversation_id.to_string(),
                speaker: ctx.speaker.to_string(),
            };
            tracing::info!(conv_id = %ctx.conversation_id, speaker = %ctx.speaker, tool = %name, "Running capability");
            let output = ctx
                .capabilities
                .execute(name, input.clone(), tool_ctx)
                .await;
            results.push(match output {
                Some(out) => ContentBlock::tool_result(id.clone(), out.output, !out.success),
                None => ContentBlock::tool_result(id.clone(), format!("Unknown tool: {name}"), true),
            });
        }
        results
    }
}

fn continue_prompt(speaker: &ParticipantId) -> String {
    format!("Continue the conversation as {speaker}.")
}

#[async_trait]
impl Responder for LlmResponder {
    async fn respond(&self, ctx: &TurnContext<'_>) -> Result<String, ResponderError> {
        let mut messages = Self::build_messages(ctx);
        let can_use_tools = !ctx.capabilities.is_empty();

        for round in 0..=self.max_tool_rounds {
            let tools_allowed = can_use_tools && round < self.max_tool_rounds;
            let response = self
                .llm
                .complete(&self.request(&messages, ctx, tools_allowed))
                .await?;

            if !(tools_allowed && response.has_tool_use()) {
                let text = response.text();
                if text.trim().is_empty() {
                    return Err(ResponderError::empty_response());
                }
                return Ok(text);
            }

            let results = self.run_tools(&response.content, ctx).await;
            messages.push(LlmMessage {
                role: MessageRole::Assistant,
                content: response.content,
            });
            messages.push(LlmMessage {
                role: MessageRole::User,
                content: results,
            });
        }

        Err(ResponderError::empty_response())
    }
}
