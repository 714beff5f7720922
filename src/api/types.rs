//! API request and response types

use serde::{Deserialize, Serialize};

/// Body of `POST /chat`, as sent by the front-end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model_name: String,
    pub model_provider: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default)]
    pub allow_search: bool,
}

/// Response listing the models `/chat` accepts
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub provider: String,
    pub models: Vec<String>,
    pub default: String,
}

/// Health probe response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Error response. The front-end checks for the `error` key.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
