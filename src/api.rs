//! HTTP API serving the chat front-end

mod handlers;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::config::LoopDefaults;
use crate::llm::ModelRegistry;
use crate::search::SearchService;
use std::sync::Arc;

/// Provider name the front-end sends
pub const PROVIDER: &str = "Groq";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub llm_registry: Arc<ModelRegistry>,
    pub search: Option<Arc<dyn SearchService>>,
    pub max_completion_tokens: u32,
    pub loop_defaults: LoopDefaults,
}

impl AppState {
    pub fn new(
        llm_registry: Arc<ModelRegistry>,
        search: Option<Arc<dyn SearchService>>,
        max_completion_tokens: u32,
        loop_defaults: LoopDefaults,
    ) -> Self {
        Self {
            llm_registry,
            search,
            max_completion_tokens,
            loop_defaults,
        }
    }
}
