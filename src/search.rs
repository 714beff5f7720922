//! Web search abstraction
//!
//! Search is never driven by the conversation loop. A participant holding
//! the [`crate::tools::WebSearchTool`] capability calls it inside its own
//! turn.

mod tavily;

pub use tavily::TavilySearch;

use crate::error::ErrorKind;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Search failure with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SearchError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SearchError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Common interface for web search providers
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Run a query and return a text digest of the results
    async fn search(&self, query: &str) -> Result<String, SearchError>;
}

#[async_trait]
impl<T: SearchService + ?Sized> SearchService for Arc<T> {
    async fn search(&self, query: &str) -> Result<String, SearchError> {
        (**self).search(query).await
    }
}
