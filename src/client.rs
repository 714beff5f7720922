//! Front-end client for the chat endpoint

use crate::api::{ChatRequest, PROVIDER};
use crate::config::{ClientSettings, DEFAULT_MODEL};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("cannot reach the agent at {url}: {message}")]
    Unreachable { url: String, message: String },
    #[error("agent returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    /// The backend answered 200 with an `error` body
    #[error("{0}")]
    Remote(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("agent returned an empty reply")]
    EmptyResult,
}

/// What the user fills in on the front-end form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendRequest {
    pub system_prompt: String,
    pub model_name: String,
    pub query: String,
    pub allow_search: bool,
}

impl FrontendRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            system_prompt: String::new(),
            model_name: DEFAULT_MODEL.to_string(),
            query: query.into(),
            allow_search: false,
        }
    }

    fn into_chat_request(self) -> ChatRequest {
        ChatRequest {
            model_name: self.model_name,
            model_provider: PROVIDER.to_string(),
            system_prompt: self.system_prompt,
            messages: vec![self.query],
            allow_search: self.allow_search,
        }
    }
}

pub struct ChatClient {
    client: Client,
    chat_url: String,
}

impl ChatClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Unreachable {
                url: settings.chat_url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            chat_url: settings.chat_url.clone(),
        })
    }

    /// Send one query and return the agent's reply text
    pub async fn submit(&self, request: FrontendRequest) -> Result<String, ClientError> {
        if request.query.trim().is_empty() {
            return Err(ClientError::EmptyQuery);
        }

        let response = self
            .client
            .post(&self.chat_url)
            .json(&request.into_chat_request())
            .send()
            .await
            .map_err(|e| ClientError::Unreachable {
                url: self.chat_url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(serde_json::Value::as_str)
                .map_or_else(|| body.to_string(), ToString::to_string);
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        match body {
            serde_json::Value::String(text) if text.trim().is_empty() => {
                Err(ClientError::EmptyResult)
            }
            serde_json::Value::String(text) => Ok(text),
            serde_json::Value::Object(map) => match map.get("error") {
                Some(error) => Err(ClientError::Remote(
                    error.as_str().map_or_else(|| error.to_string(), ToString::to_string),
                )),
                None => Err(ClientError::Decode(serde_json::Value::Object(map).to_string())),
            },
            other => Err(ClientError::Decode(other.to_string())),
        }
    }
}
