//! Error taxonomy and run reports for the pipeline stages.

use crate::{embedding::EmbeddingClientError, qdrant::VectorStoreError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors emitted by the batch, summarization and upsert stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input directory does not exist; aborts the run.
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    /// A document produced no content or the partitioner failed on it.
    #[error("Failed to extract text from {}: {reason}", document.display())]
    Extraction {
        /// Document that failed.
        document: PathBuf,
        /// Human-readable cause.
        reason: String,
    },
    /// Another document of the same run already claimed this output file.
    #[error("{} would overwrite {} from earlier in this run", document.display(), output.display())]
    OutputCollision {
        /// Document that was not converted.
        document: PathBuf,
        /// Record file both documents map to.
        output: PathBuf,
    },
    /// A stored record lacks required fields; the record is skipped.
    #[error("Malformed record at {location}: {reason}")]
    RecordFormat {
        /// File and array index of the entry.
        location: String,
        /// Which fields were missing or mistyped.
        reason: String,
    },
    /// Writing vectors to the store failed; fatal for the run.
    #[error("Vector upsert failed: {0}")]
    Upsert(#[source] VectorStoreError),
    /// Filesystem access failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A record file could not be parsed or serialized.
    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        /// Record file being processed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    pub(crate) fn extraction(document: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Extraction {
            document: document.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised while answering a question against the vector store.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Embedding provider failed to return vectors for the question.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Embedding provider returned no vectors.
    #[error("Embedding provider returned no vectors for the query")]
    EmptyEmbedding,
    /// Returned embedding dimension does not match configuration.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimension.
        expected: usize,
        /// Dimension produced by the provider.
        actual: usize,
    },
    /// Vector store rejected the query.
    #[error("Vector store query failed: {0}")]
    Store(#[from] VectorStoreError),
}

/// Outcome of converting a directory of PDFs into record files.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Record files written in this run.
    pub written: Vec<PathBuf>,
    /// Documents skipped because their output already existed.
    pub skipped: Vec<PathBuf>,
    /// Documents that failed, with the error that stopped them.
    pub failed: Vec<PipelineError>,
}

impl BatchReport {
    /// Whether every discovered document was converted or skipped.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of a summarization pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SummaryReport {
    /// Records summarized by the model.
    pub summarized: usize,
    /// Records that received the no-content sentinel without a model call.
    pub sentinel: usize,
    /// Records that already carried a summary and were left alone.
    pub kept: usize,
    /// Records whose model call failed; left without a summary.
    pub failed: usize,
    /// Record files that could not be read or written.
    pub failed_files: usize,
}

impl SummaryReport {
    pub(crate) fn absorb(&mut self, other: SummaryReport) {
        self.summarized += other.summarized;
        self.sentinel += other.sentinel;
        self.kept += other.kept;
        self.failed += other.failed;
        self.failed_files += other.failed_files;
    }
}

/// Outcome of an embedding and upsert run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpsertReport {
    /// Records considered.
    pub records: usize,
    /// Vectors written to the store.
    pub upserted: usize,
    /// Records excluded because they were not summarized or failed to embed.
    pub excluded: usize,
    /// Upsert calls issued.
    pub batches: usize,
}

/// One ranked answer returned by the query pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    /// Vector identifier.
    pub id: String,
    /// Similarity score; higher is closer.
    pub score: f32,
    /// Company label of the source document, when stored.
    pub company: Option<String>,
    /// Document year, when stored.
    pub year: Option<i32>,
    /// Source page number, when stored.
    pub page: Option<u32>,
    /// Page summary that was embedded.
    pub summarized: Option<String>,
    /// Cleaned page text.
    pub content: Option<String>,
}
