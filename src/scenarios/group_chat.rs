//! Admin, Coder and Critic collaborating on a small coding task

use super::{Collaborators, Scenario};
use crate::config::ConfigError;
use crate::conversation::{
    LoopConfig, ModeratedSelector, Opening, Participant, RoundRobin, StopPredicate, TurnLoop,
};
use crate::responders::{LlmResponder, ProxyResponder};
use std::sync::Arc;

pub const MAX_TURNS: u32 = 7;
pub const STOP_TOKEN: &str = "TERMINATE";

pub const ADMIN_PROMPT: &str = "A human admin. Send comments and terminate the chat by saying 'TERMINATE' when the task is fully complete.";
pub const CODER_PROMPT: &str = "You are a professional Python programmer. Your job is to write high-quality Python codes. You must wait for the Critic's approval before executing or confirming the final code.";
pub const CRITIC_PROMPT: &str = "You are a code tester. Your job is to check the Coder's plan and code for correctness, reliability. You provide constructive criticism and must explicitly give the final approval ('LOOKS GOOD!') only when the code is perfect and ready.";
pub const MANAGER_PROMPT: &str = "You are the Group Chat Manager. You moderate the chat between Coder and Critic, making sure that the Coder provides code and the Critic reviews it before the Admin approves the final solution.";
pub const DEFAULT_TASK: &str = "Write a Python script to calculate the first 10 fibonacci numbers. The script must then save the complete code to a file named 'demo.txt'. The Coder must get the approval from Critic before executing or proposing the final solution.";

#[derive(Debug, Clone)]
pub struct GroupChatOptions {
    /// Admin's opening message
    pub task: String,
    /// Let the model pick speakers instead of rotating
    pub moderated: bool,
    pub max_turns: u32,
}

impl Default for GroupChatOptions {
    fn default() -> Self {
        Self {
            task: DEFAULT_TASK.to_string(),
            moderated: false,
            max_turns: MAX_TURNS,
        }
    }
}

pub fn participants(collab: &Collaborators) -> Vec<Participant> {
    let llm_participant = |id: &str, role: &str, prompt: &str| {
        Participant::new(
            id,
            role,
            Arc::new(LlmResponder::new(
                collab.llm.clone(),
                prompt,
                collab.max_completion_tokens,
            )),
        )
    };

    vec![
        Participant::new("Admin", ADMIN_PROMPT, Arc::new(ProxyResponder::default()))
            .with_stop(StopPredicate::ends_with(STOP_TOKEN)),
        llm_participant("Coder", "Python programmer", CODER_PROMPT),
        llm_participant("Critic", "code tester", CRITIC_PROMPT),
    ]
}

/// The Admin opens with the task; speakers never repeat back to back
pub fn build(collab: &Collaborators, options: GroupChatOptions) -> Result<Scenario, ConfigError> {
    let config = LoopConfig::from_defaults(options.max_turns, collab.loop_defaults);
    let participants = participants(collab);

    let turn_loop = if options.moderated {
        let selector = ModeratedSelector::new(collab.llm.clone(), MANAGER_PROMPT, false);
        TurnLoop::new(participants, selector, config)?
    } else {
        TurnLoop::new(participants, RoundRobin::without_repeat(), config)?
    };

    Ok(Scenario {
        turn_loop,
        opening: Some(Opening::new("Admin", options.task)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoopDefaults;
    use crate::conversation::testing::MockLlmClient;
    use crate::conversation::TerminalReason;
    use crate::llm::LlmResponse;
    use std::time::Duration;

    fn collaborators(llm: Arc<MockLlmClient>) -> Collaborators {
        Collaborators {
            llm,
            search: None,
            max_completion_tokens: 256,
            loop_defaults: LoopDefaults {
                retry_budget: 0,
                response_timeout: Duration::from_secs(5),
            },
        }
    }

    #[tokio::test]
    async fn test_runs_to_turn_cap() {
        let llm = Arc::new(MockLlmClient::new("m"));
        for reply in ["code v1", "needs tests", "code v2", "still flaky"] {
            llm.queue_response(LlmResponse::from_text(reply));
        }

        let outcome = build(&collaborators(llm.clone()), GroupChatOptions::default())
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(outcome.reason, TerminalReason::MaxTurnsReached);
        assert_eq!(outcome.turn_count, MAX_TURNS);
        assert_eq!(outcome.transcript[0].content, DEFAULT_TASK);
        let speakers: Vec<&str> = outcome.transcript.iter().map(|m| m.sender.as_str()).collect();
        assert_eq!(
            speakers,
            vec!["Admin", "Coder", "Critic", "Admin", "Coder", "Critic", "Admin"]
        );
        assert_eq!(llm.recorded_requests().len(), 4);
    }

    #[tokio::test]
    async fn test_terminate_token_ends_chat() {
        let llm = Arc::new(MockLlmClient::new("m"));
        llm.queue_response(LlmResponse::from_text("def fib(): ..."));
        llm.queue_response(LlmResponse::from_text("LOOKS GOOD! TERMINATE"));

        let outcome = build(&collaborators(llm), GroupChatOptions::default())
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(
            outcome.reason,
            TerminalReason::StopPredicate {
                participant: "Admin".into()
            }
        );
        assert_eq!(outcome.turn_count, 3);
    }

    #[tokio::test]
    async fn test_moderated_chat_asks_manager() {
        let llm = Arc::new(MockLlmClient::new("m"));
        // Manager picks Critic (Admin excluded), Critic replies
        llm.queue_response(LlmResponse::from_text("Critic"));
        llm.queue_response(LlmResponse::from_text("Where is the code? TERMINATE"));

        let options = GroupChatOptions {
            moderated: true,
            ..GroupChatOptions::default()
        };
        let outcome = build(&collaborators(llm.clone()), options)
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(outcome.transcript[1].sender.as_str(), "Critic");
        assert_eq!(outcome.turn_count, 2);
        let manager_request = &llm.recorded_requests()[0];
        assert!(manager_request.system[0].text.starts_with(MANAGER_PROMPT));
    }
}
