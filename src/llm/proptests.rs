//! Property-based tests for the chat-completions translation layer
//!
//! - Empty responses are rejected
//! - Tool calls with empty names are dropped
//! - Message translation never produces empty output
//! - Text and tool calls survive translation

use super::openai::{
    normalize_response, translate_message, OpenAIChoice, OpenAIFunctionCall, OpenAIMessage,
    OpenAIResponse, OpenAIToolCall, OpenAIUsage,
};
use super::types::{ContentBlock, LlmMessage, MessageRole};
use crate::error::ErrorKind;
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_text_block() -> impl Strategy<Value = ContentBlock> {
    "[a-zA-Z0-9 _.!?,]{1,100}".prop_map(|text| ContentBlock::Text { text })
}

fn arb_tool_use_block() -> impl Strategy<Value = ContentBlock> {
    ("[a-z0-9_]{5,20}", "[a-z_]{3,20}", arb_json_value())
        .prop_map(|(id, name, input)| ContentBlock::ToolUse { id, name, input })
}

fn arb_tool_result_block() -> impl Strategy<Value = ContentBlock> {
    ("[a-z0-9_]{5,20}", "[a-zA-Z0-9 _.!?,]{0,100}", any::<bool>()).prop_map(
        |(tool_use_id, content, is_error)| ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        },
    )
}

fn arb_json_value() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::Bool),
        (-1000i64..1000).prop_map(|n| serde_json::Value::Number(n.into())),
        "[a-zA-Z0-9 ]{0,50}".prop_map(serde_json::Value::String),
        proptest::collection::hash_map("[a-z_]{1,10}", "[a-zA-Z0-9 ]{0,30}", 0..5).prop_map(|m| {
            serde_json::Value::Object(
                m.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::String(v)))
                    .collect(),
            )
        }),
    ]
}

/// User turn: text and tool results
fn arb_user_message() -> impl Strategy<Value = LlmMessage> {
    proptest::collection::vec(
        prop_oneof![3 => arb_text_block(), 2 => arb_tool_result_block()],
        1..6,
    )
    .prop_map(|content| LlmMessage {
        role: MessageRole::User,
        content,
    })
}

/// Assistant turn: text and tool calls
fn arb_assistant_message() -> impl Strategy<Value = LlmMessage> {
    proptest::collection::vec(
        prop_oneof![3 => arb_text_block(), 3 => arb_tool_use_block()],
        1..6,
    )
    .prop_map(|content| LlmMessage {
        role: MessageRole::Assistant,
        content,
    })
}

fn arb_message() -> impl Strategy<Value = LlmMessage> {
    prop_oneof![arb_user_message(), arb_assistant_message()]
}

fn make_response(
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
    finish_reason: Option<String>,
) -> OpenAIResponse {
    OpenAIResponse {
        choices: vec![OpenAIChoice {
            message: OpenAIMessage {
                role: "assistant".to_string(),
                content,
                tool_calls,
                tool_call_id: None,
            },
            finish_reason,
        }],
        usage: Some(OpenAIUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
        }),
    }
}

fn make_tool_call(id: &str, name: &str, arguments: &str) -> OpenAIToolCall {
    OpenAIToolCall {
        id: id.to_string(),
        r#type: "function".to_string(),
        function: OpenAIFunctionCall {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }
}

// ============================================================================
// Response normalization
// ============================================================================

proptest! {
    #[test]
    fn prop_normalize_rejects_empty(finish_reason in proptest::option::of("[a-z_]{3,10}")) {
        let err = normalize_response(make_response(None, None, finish_reason)).unwrap_err();
        prop_assert_eq!(err.kind, ErrorKind::EmptyResponse);
        prop_assert!(err.kind.is_retryable());
    }

    #[test]
    fn prop_normalize_ok_implies_nonempty(
        text in proptest::option::of("[a-zA-Z ]{0,20}"),
        names in proptest::collection::vec("[a-z_]{0,8}", 0..4),
    ) {
        let calls: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, n)| make_tool_call(&format!("call_{i}"), n, "{}"))
            .collect();
        let calls = (!calls.is_empty()).then_some(calls);
        if let Ok(resp) = normalize_response(make_response(text, calls, None)) {
            prop_assert!(!resp.content.is_empty());
        }
    }

    #[test]
    fn prop_normalize_keeps_only_named_tools(
        names in proptest::collection::vec("[a-z_]{0,8}", 1..6),
    ) {
        let calls: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, n)| make_tool_call(&format!("call_{i}"), n, "{\"query\":\"x\"}"))
            .collect();
        let expected = names.iter().filter(|n| !n.is_empty()).count();
        let result = normalize_response(make_response(Some("ok".to_string()), Some(calls), None));
        let resp = result.unwrap();
        prop_assert_eq!(resp.tool_uses().len(), expected);
    }

    #[test]
    fn prop_normalize_valid_json_args_roundtrip(input in arb_json_value()) {
        let args = input.to_string();
        let resp = normalize_response(make_response(
            None,
            Some(vec![make_tool_call("call_1", "web_search", &args)]),
            Some("tool_calls".to_string()),
        ))
        .unwrap();
        let uses = resp.tool_uses();
        prop_assert_eq!(uses.len(), 1);
        prop_assert_eq!(uses[0].2, &input);
    }
}

// ============================================================================
// Message translation
// ============================================================================

proptest! {
    #[test]
    fn prop_translate_never_empty_output(msg in arb_message()) {
        prop_assert!(!translate_message(&msg).is_empty());
    }

    #[test]
    fn prop_translated_messages_have_content_or_tool_id(msg in arb_message()) {
        for m in &translate_message(&msg) {
            prop_assert!(
                m.content.is_some() || m.tool_calls.is_some() || m.tool_call_id.is_some(),
                "message with role {} carries nothing",
                m.role,
            );
        }
    }

    #[test]
    fn prop_translate_preserves_text(msg in arb_assistant_message()) {
        let all_text: String = translate_message(&msg)
            .iter()
            .filter_map(|m| m.content.clone())
            .collect();
        for block in &msg.content {
            if let ContentBlock::Text { text } = block {
                prop_assert!(all_text.contains(text.as_str()));
            }
        }
    }

    #[test]
    fn prop_translate_preserves_tool_use_count(msg in arb_assistant_message()) {
        let expected = msg
            .content
            .iter()
            .filter(|b| matches!(b, ContentBlock::ToolUse { .. }))
            .count();
        let translated: usize = translate_message(&msg)
            .iter()
            .filter_map(|m| m.tool_calls.as_ref())
            .map(Vec::len)
            .sum();
        prop_assert_eq!(translated, expected);
    }

    #[test]
    fn prop_tool_results_become_tool_role(msg in arb_user_message()) {
        let ids: Vec<&str> = msg
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                _ => None,
            })
            .collect();
        let translated = translate_message(&msg);
        let tool_msgs: Vec<_> = translated.iter().filter(|m| m.role == "tool").collect();
        prop_assert_eq!(tool_msgs.len(), ids.len());
        for (id, m) in ids.iter().zip(tool_msgs) {
            prop_assert_eq!(m.tool_call_id.as_deref(), Some(*id));
        }
    }

    #[test]
    fn prop_translated_messages_serialize(msg in arb_message()) {
        for m in &translate_message(&msg) {
            prop_assert!(serde_json::to_value(m).is_ok());
        }
    }
}
