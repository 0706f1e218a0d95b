//! Semantic search over the page index.

use crate::{
    config::Config,
    embedding::EmbeddingClient,
    processing::{
        mappers::map_scored_point,
        types::{QueryError, QueryMatch},
    },
    qdrant::{MetadataFilter, VectorQuery, VectorStore},
};

/// Default number of matches returned per question.
pub const DEFAULT_TOP_K: usize = 5;

/// Index settings for querying.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Index (collection) to search.
    pub index_name: String,
    /// Expected embedding dimensionality.
    pub dimension: usize,
}

impl From<&Config> for QueryOptions {
    fn from(config: &Config) -> Self {
        Self {
            index_name: config.vector_store.index_name.clone(),
            dimension: config.embedding.dimension,
        }
    }
}

/// Embeds questions and retrieves the closest page summaries.
pub struct QueryPipeline {
    options: QueryOptions,
    embedder: Box<dyn EmbeddingClient>,
    store: Box<dyn VectorStore>,
}

impl QueryPipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        options: QueryOptions,
        embedder: Box<dyn EmbeddingClient>,
        store: Box<dyn VectorStore>,
    ) -> Self {
        Self {
            options,
            embedder,
            store,
        }
    }

    /// Answer `question`, surfacing any failure.
    pub async fn try_query(
        &self,
        question: &str,
        filter: Option<MetadataFilter>,
        top_k: usize,
    ) -> Result<Vec<QueryMatch>, QueryError> {
        let vector = self
            .embedder
            .generate_embeddings(vec![question.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(QueryError::EmptyEmbedding)?;
        if vector.is_empty() {
            return Err(QueryError::EmptyEmbedding);
        }
        if vector.len() != self.options.dimension {
            return Err(QueryError::DimensionMismatch {
                expected: self.options.dimension,
                actual: vector.len(),
            });
        }

        let points = self
            .store
            .query(
                &self.options.index_name,
                VectorQuery {
                    vector,
                    top_k,
                    filter,
                    include_metadata: true,
                },
            )
            .await?;
        tracing::debug!(
            index = %self.options.index_name,
            matches = points.len(),
            "Query answered"
        );
        Ok(points.into_iter().map(map_scored_point).collect())
    }

    /// Answer `question`; failures are logged and yield no matches.
    pub async fn query(
        &self,
        question: &str,
        filter: Option<MetadataFilter>,
        top_k: usize,
    ) -> Vec<QueryMatch> {
        match self.try_query(question, filter, top_k).await {
            Ok(matches) => matches,
            Err(error) => {
                tracing::error!(error = %error, "Query failed");
                Vec::new()
            }
        }
    }
}
