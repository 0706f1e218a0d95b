//! Abstractive page summaries via an OpenAI-compatible chat-completions endpoint.
//!
//! The model is asked for a JSON object `{"summary": "..."}`. Many self-hosted models wrap that
//! object in prose or code fences, so the reply is parsed leniently.

use crate::config::LlmConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// System prompt sent with every summarization request.
pub const SYSTEM_PROMPT: &str = r#"You are a precise and concise summarization agent.

Your goal is to summarize any kind of text, whether it is a formal financial report, business update, meeting note, press release, or generic content. Your summaries should always be crisp, context-aware, and free of filler.

Rules:
1. If the input includes numbers (financial data, metrics, dates, percentages), include them exactly in the summary.
2. If the input contains financial insights, strategy, risks, or leadership commentary, highlight those clearly.
3. If the input is administrative or doesn't contain meaningful content, return:
   { "summary": "No substantive content available to summarize." }
4. Do NOT infer or fabricate numbers, people, or insights that are not clearly present.
5. Always respond ONLY in the following JSON format:
   { "summary": "..." }
"#;

/// Errors surfaced while attempting abstractive summarization.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was unreachable or its endpoint does not exist.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by abstractive summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Summarize one page of cleaned text, returning the bare summary string.
    async fn summarize(&self, content: &str) -> Result<String, SummarizationClientError>;
}

/// Build the chat-completions summarization client from configuration.
pub fn get_summarization_client(
    config: &LlmConfig,
) -> Result<Box<dyn SummarizationClient>, SummarizationClientError> {
    let client = OpenAiSummarizationClient::new(config)?;
    tracing::debug!(model = %config.model, base_url = %config.base_url, "Initialized summarization client");
    Ok(Box::new(client))
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiSummarizationClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl OpenAiSummarizationClient {
    /// Construct a client from the LLM settings.
    pub fn new(config: &LlmConfig) -> Result<Self, SummarizationClientError> {
        let http = Client::builder()
            .user_agent("finrag/summary")
            .build()
            .map_err(|error| SummarizationClientError::ProviderUnavailable(error.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryOutput {
    summary: String,
}

#[async_trait]
impl SummarizationClient for OpenAiSummarizationClient {
    async fn summarize(&self, content: &str) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "model": self.model,
            "temperature": self.temperature,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": content }
            ]
        });

        let endpoint = self.endpoint();
        let mut request = self.http.post(&endpoint).json(&payload);
        if let Some(key) = self.api_key.as_deref() {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|error| {
            SummarizationClientError::ProviderUnavailable(format!(
                "failed to reach {endpoint}: {error}"
            ))
        })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "{endpoint} returned 404"
            )));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "{endpoint} returned {status}: {body}"
            )));
        }

        let body: ChatResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode chat response: {error}"
            ))
        })?;
        let reply = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                SummarizationClientError::InvalidResponse("response had no message content".into())
            })?;

        parse_summary(&reply)
    }
}

/// Extract the `summary` field from a model reply.
///
/// Accepts the bare object or an object embedded in surrounding text.
pub fn parse_summary(reply: &str) -> Result<String, SummarizationClientError> {
    let trimmed = reply.trim();
    if let Ok(output) = serde_json::from_str::<SummaryOutput>(trimmed) {
        return Ok(output.summary.trim().to_string());
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && start < end
        && let Ok(output) = serde_json::from_str::<SummaryOutput>(&trimmed[start..=end])
    {
        return Ok(output.summary.trim().to_string());
    }

    Err(SummarizationClientError::InvalidResponse(format!(
        "reply did not contain a summary object: {}",
        truncate(trimmed, 120)
    )))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}
