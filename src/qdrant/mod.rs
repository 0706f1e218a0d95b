//! Vector store integration backed by Qdrant.

pub mod client;
pub mod filters;
mod payload;
pub mod types;

use crate::records::VectorRecord;
use async_trait::async_trait;

pub use client::QdrantService;
pub use filters::build_metadata_filter;
pub use types::{
    DistanceMetric, MetadataFilter, ScoredPoint, VectorQuery, VectorStoreError, YearRange,
};

/// Operations the pipeline needs from a hosted vector index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the index with the given dimensionality and metric unless it already exists.
    async fn ensure_index(
        &self,
        name: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<(), VectorStoreError>;

    /// Insert or replace one batch of vectors, returning how many were written.
    async fn upsert(
        &self,
        name: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, VectorStoreError>;

    /// Return the nearest neighbours of `query.vector`, best match first.
    async fn query(
        &self,
        name: &str,
        query: VectorQuery,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError>;
}
