//! Embedding and batched upsert of summarized records.

use crate::{
    config::Config,
    embedding::EmbeddingClient,
    processing::types::{PipelineError, UpsertReport},
    qdrant::{DistanceMetric, VectorStore},
    records::{
        PageRecord, StagedRecord, VectorRecord,
        store::{RecordFile, list_record_files},
    },
};
use std::path::Path;

/// Index settings for an upsert run.
#[derive(Debug, Clone)]
pub struct UpsertOptions {
    /// Target index (collection) name.
    pub index_name: String,
    /// Vector dimensionality; also used to create the index.
    pub dimension: usize,
    /// Vectors per upsert call.
    pub batch_size: usize,
}

impl From<&Config> for UpsertOptions {
    fn from(config: &Config) -> Self {
        Self {
            index_name: config.vector_store.index_name.clone(),
            dimension: config.embedding.dimension,
            batch_size: config.vector_store.batch_size,
        }
    }
}

/// Embeds summarized records and writes them to the vector store in batches.
pub struct UpsertPipeline {
    options: UpsertOptions,
    embedder: Box<dyn EmbeddingClient>,
    store: Box<dyn VectorStore>,
}

impl UpsertPipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        options: UpsertOptions,
        embedder: Box<dyn EmbeddingClient>,
        store: Box<dyn VectorStore>,
    ) -> Self {
        Self {
            options,
            embedder,
            store,
        }
    }

    /// Load every well-formed record from the `.json` files of `dir`, in file-name order.
    pub fn load_records(&self, dir: &Path) -> Result<Vec<PageRecord>, PipelineError> {
        let mut records = Vec::new();
        for path in list_record_files(dir)? {
            let file = RecordFile::load(&path)?;
            records.extend(file.into_records());
        }
        tracing::info!(dir = %dir.display(), records = records.len(), "Loaded records");
        Ok(records)
    }

    /// Embed each summarized record and upsert the vectors in batches.
    pub async fn upsert_records(
        &self,
        records: Vec<PageRecord>,
    ) -> Result<UpsertReport, PipelineError> {
        let index = self.options.index_name.as_str();
        self.store
            .ensure_index(index, self.options.dimension, DistanceMetric::Cosine)
            .await
            .map_err(|error| {
                tracing::error!(index, error = %error, "Failed to ensure index");
                PipelineError::Upsert(error)
            })?;

        let mut report = UpsertReport {
            records: records.len(),
            ..UpsertReport::default()
        };
        let mut vectors: Vec<VectorRecord> = Vec::with_capacity(records.len());
        for record in records {
            match self.embed_record(record).await {
                Some(vector) => vectors.push(vector),
                None => report.excluded += 1,
            }
        }

        let total = vectors.len();
        let batch_size = self.options.batch_size.max(1);
        let mut pending = vectors.into_iter().peekable();
        while pending.peek().is_some() {
            let batch: Vec<VectorRecord> = pending.by_ref().take(batch_size).collect();
            let written = self
                .store
                .upsert(index, batch)
                .await
                .map_err(|error| {
                    tracing::error!(
                        index,
                        batch = report.batches + 1,
                        error = %error,
                        "Upsert batch failed"
                    );
                    PipelineError::Upsert(error)
                })?;
            report.batches += 1;
            report.upserted += written;
            tracing::info!(
                index,
                batch = report.batches,
                upserted = report.upserted,
                total,
                "Upserted batch"
            );
        }

        tracing::info!(
            index,
            upserted = report.upserted,
            excluded = report.excluded,
            batches = report.batches,
            "Upsert complete"
        );
        Ok(report)
    }

    /// Load the records of `dir` and upsert them.
    pub async fn run(&self, dir: &Path) -> Result<UpsertReport, PipelineError> {
        let records = self.load_records(dir)?;
        self.upsert_records(records).await
    }

    async fn embed_record(&self, record: PageRecord) -> Option<VectorRecord> {
        let page = record.page_num;
        let company = record.company.clone();
        let StagedRecord::Summarized(summarized) = record.into_stage() else {
            tracing::warn!(%company, page, "Record has no summary; excluded from upsert");
            return None;
        };

        let vector = match self
            .embedder
            .generate_embeddings(vec![summarized.summarized.clone()])
            .await
        {
            Ok(mut vectors) if !vectors.is_empty() => vectors.swap_remove(0),
            Ok(_) => {
                tracing::warn!(%company, page, "Embedding provider returned no vector; excluded");
                return None;
            }
            Err(error) => {
                tracing::warn!(%company, page, error = %error, "Embedding failed; excluded");
                return None;
            }
        };

        if vector.len() != self.options.dimension {
            tracing::warn!(
                %company,
                page,
                expected = self.options.dimension,
                actual = vector.len(),
                "Embedding dimension mismatch; excluded"
            );
            return None;
        }
        Some(summarized.embed(vector))
    }
}
