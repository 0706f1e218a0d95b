//! Embedding client abstraction and HTTP adapters.
//!
//! Two wire protocols are supported: the OpenAI `/embeddings` shape (also served by most
//! sentence-transformer gateways) and Ollama's `/api/embed`.

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider answered with a body that did not match its protocol.
    #[error("Malformed embedding response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied text, in input order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Build the embedding client selected by configuration.
pub fn get_embedding_client(
    config: &EmbeddingConfig,
) -> Result<Box<dyn EmbeddingClient>, EmbeddingClientError> {
    let http = Client::builder()
        .user_agent("finrag/embedding")
        .build()
        .map_err(|error| EmbeddingClientError::GenerationFailed(error.to_string()))?;
    tracing::debug!(
        provider = ?config.provider,
        model = %config.model,
        dimension = config.dimension,
        "Initialized embedding client"
    );

    let client: Box<dyn EmbeddingClient> = match config.provider {
        EmbeddingProvider::OpenAI => Box::new(OpenAiEmbeddingClient {
            http,
            base_url: config.url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }),
        EmbeddingProvider::Ollama => Box::new(OllamaEmbeddingClient {
            http,
            base_url: config.url.clone(),
            model: config.model.clone(),
        }),
    };
    Ok(client)
}

/// Client for OpenAI-compatible `/embeddings` endpoints.
pub struct OpenAiEmbeddingClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        let endpoint = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let mut request = self.http.post(&endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: &texts,
        });
        if let Some(key) = self.api_key.as_deref() {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|error| {
            EmbeddingClientError::GenerationFailed(format!("failed to reach {endpoint}: {error}"))
        })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "{endpoint} returned {status}: {body}"
            )));
        }

        let mut body: OpenAiEmbeddingResponse = response
            .json()
            .await
            .map_err(|error| EmbeddingClientError::InvalidResponse(error.to_string()))?;
        body.data.sort_by_key(|entry| entry.index);
        let vectors: Vec<Vec<f32>> = body.data.into_iter().map(|entry| entry.embedding).collect();
        ensure_count(vectors, texts.len())
    }
}

/// Client for a local Ollama runtime.
pub struct OllamaEmbeddingClient {
    http: Client,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        let endpoint = format!("{}/api/embed", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&endpoint)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: &texts,
            })
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::GenerationFailed(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaEmbeddingResponse = response
            .json()
            .await
            .map_err(|error| EmbeddingClientError::InvalidResponse(error.to_string()))?;
        ensure_count(body.embeddings, texts.len())
    }
}

fn ensure_count(
    vectors: Vec<Vec<f32>>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
    if vectors.len() == expected {
        Ok(vectors)
    } else {
        Err(EmbeddingClientError::InvalidResponse(format!(
            "expected {expected} embeddings, got {}",
            vectors.len()
        )))
    }
}
