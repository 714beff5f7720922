//! Tavily search API client

use super::{SearchError, SearchService};
use crate::config::{Secret, SearchSettings};
use crate::error::{classify_reqwest, ErrorKind};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::time::{Duration, Instant};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound on the digest handed back to a model
const MAX_DIGEST_CHARS: usize = 2_000;
const MAX_SNIPPET_CHARS: usize = 300;

pub struct TavilySearch {
    client: Client,
    api_key: Secret,
    endpoint: String,
    max_results: u32,
}

impl TavilySearch {
    pub fn new(settings: &SearchSettings) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                SearchError::new(
                    ErrorKind::Unknown,
                    format!("Failed to create HTTP client: {e}"),
                )
            })?;

        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            endpoint: settings.endpoint.clone(),
            max_results: settings.max_results,
        })
    }
}

#[async_trait]
impl SearchService for TavilySearch {
    async fn search(&self, query: &str) -> Result<String, SearchError> {
        let start = Instant::now();
        let request = TavilyRequest {
            query,
            max_results: self.max_results,
            include_answer: true,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| SearchError::new(classify_reqwest(&e), format!("Search request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            SearchError::new(ErrorKind::Network, format!("Failed to read search response: {e}"))
        })?;

        if !status.is_success() {
            tracing::warn!(status = %status, duration_ms = %start.elapsed().as_millis(), "Search failed");
            return Err(SearchError::new(
                ErrorKind::from_status(status.as_u16()),
                format!("Search returned HTTP {status}: {}", truncate(&body, MAX_SNIPPET_CHARS)),
            ));
        }

        let parsed: TavilyResponse = serde_json::from_str(&body).map_err(|e| {
            SearchError::new(ErrorKind::Unknown, format!("Failed to parse search response: {e}"))
        })?;

        tracing::info!(
            results = parsed.results.len(),
            has_answer = parsed.answer.is_some(),
            duration_ms = %start.elapsed().as_millis(),
            "Search completed"
        );

        digest(&parsed)
    }
}

/// Turn a response into the text a model sees
fn digest(resp: &TavilyResponse) -> Result<String, SearchError> {
    if let Some(answer) = resp.answer.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        return Ok(truncate(answer, MAX_DIGEST_CHARS));
    }

    if resp.results.is_empty() {
        return Err(SearchError::new(
            ErrorKind::EmptyResponse,
            "Search returned no results",
        ));
    }

    let mut out = String::new();
    for result in &resp.results {
        let _ = writeln!(
            out,
            "{} ({}): {}",
            result.title.trim(),
            result.url,
            truncate(result.content.trim(), MAX_SNIPPET_CHARS)
        );
    }
    Ok(truncate(out.trim_end(), MAX_DIGEST_CHARS))
}

/// Truncate on a char boundary
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: u32,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}
