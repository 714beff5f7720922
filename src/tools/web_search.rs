//! Web search capability backed by a [`SearchService`]

use super::{Tool, ToolContext, ToolOutput};
use crate::search::SearchService;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct WebSearchTool {
    search: Arc<dyn SearchService>,
}

impl WebSearchTool {
    pub fn new(search: Arc<dyn SearchService>) -> Self {
        Self { search }
    }
}

#[derive(Debug, Deserialize)]
struct WebSearchInput {
    query: String,
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        "web_search"
    }

    fn description(&self) -> String {
        "Search the web for current facts. Returns a short digest of the best results.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search for"
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let input: WebSearchInput = match serde_json::from_value(input) {
            Ok(input) => input,
            Err(e) => return ToolOutput::error(format!("Invalid input: {e}")),
        };

        let query = input.query.trim();
        if query.is_empty() {
            return ToolOutput::error("Query must not be empty");
        }

        tokio::select! {
            result = self.search.search(query) => match result {
                Ok(text) => ToolOutput::success(text),
                Err(e) => {
                    tracing::warn!(
                        conv_id = %ctx.conversation_id,
                        speaker = %ctx.speaker,
                        kind = %e.kind,
                        error = %e.message,
                        "Web search failed, returning error to model"
                    );
                    ToolOutput::error(format!("Search failed: {}", e.message))
                }
            },
            () = ctx.cancel.cancelled() => ToolOutput::error("Search cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::testing::{FailingSearch, StaticSearch};
    use crate::error::ErrorKind;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> ToolContext {
        ToolContext {
            cancel: CancellationToken::new(),
            conversation_id: "conv".to_string(),
            speaker: "Simple Fact Checker".to_string(),
        }
    }

    #[tokio::test]
    async fn test_search_success() {
        let tool = WebSearchTool::new(Arc::new(StaticSearch::new("9.58 seconds")));
        let out = tool.run(json!({"query": "100m record"}), ctx()).await;
        assert_eq!(out, ToolOutput::success("9.58 seconds"));
    }

    #[tokio::test]
    async fn test_search_failure_is_reported_to_model() {
        let tool = WebSearchTool::new(Arc::new(FailingSearch::new(ErrorKind::Auth)));
        let out = tool.run(json!({"query": "100m record"}), ctx()).await;
        assert!(!out.success);
        assert!(out.output.starts_with("Search failed"));
    }

    #[tokio::test]
    async fn test_missing_query_rejected() {
        let tool = WebSearchTool::new(Arc::new(StaticSearch::new("unused")));
        let out = tool.run(json!({"q": "x"}), ctx()).await;
        assert!(!out.success);
        let out = tool.run(json!({"query": "   "}), ctx()).await;
        assert!(!out.success);
    }
}
