//! Shared types used by the vector store client and helpers.

use crate::config::ConfigError;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with the vector store.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// Connection settings were incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Base URL failed to parse or normalize.
    #[error("Invalid vector store URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The store responded with an unexpected status code.
    #[error("Unexpected vector store response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the store.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Similarity metric declared when an index is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    /// Cosine similarity.
    Cosine,
    /// Dot product.
    Dot,
    /// Euclidean distance.
    Euclid,
}

impl DistanceMetric {
    /// Name understood by Qdrant's collection API.
    pub fn as_qdrant(self) -> &'static str {
        match self {
            Self::Cosine => "Cosine",
            Self::Dot => "Dot",
            Self::Euclid => "Euclid",
        }
    }
}

/// Metadata constraints applied during similarity search.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MetadataFilter {
    /// Exact match on `company`.
    pub company: Option<String>,
    /// Exact match on `year`.
    pub year: Option<i32>,
    /// Inclusive bounds on `year`.
    pub year_range: Option<YearRange>,
    /// Exact match on `page`.
    pub page: Option<u32>,
}

/// Inclusive year boundaries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    /// Inclusive lower bound (`gte`).
    pub start: Option<i32>,
    /// Inclusive upper bound (`lte`).
    pub end: Option<i32>,
}

/// Nearest-neighbour request.
#[derive(Debug, Clone)]
pub struct VectorQuery {
    /// Embedded question.
    pub vector: Vec<f32>,
    /// Number of matches to return.
    pub top_k: usize,
    /// Optional metadata constraints.
    pub filter: Option<MetadataFilter>,
    /// Whether stored metadata should be returned with each match.
    pub include_metadata: bool,
}

/// Scored payload returned by similarity queries.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Identifier assigned to the vector.
    pub id: String,
    /// Similarity score computed by the store.
    pub score: f32,
    /// Optional payload associated with the vector.
    pub payload: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    pub(crate) result: QueryResponseResult,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryResponseResult {
    Points(Vec<QueryPoint>),
    Object {
        #[serde(default)]
        points: Vec<QueryPoint>,
    },
}

#[derive(Deserialize)]
pub(crate) struct QueryPoint {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}
