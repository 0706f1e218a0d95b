//! PDF partitioning collaborators.
//!
//! A partitioner turns a document into an ordered list of text [`Element`]s tagged with the page
//! they came from. Layout analysis is not done here: the local backend reads the PDF text layer
//! with `lopdf`, and the hosted backend forwards the file to an Unstructured partition API.

mod local;
mod unstructured;

use crate::config::{ExtractionConfig, ExtractionStrategy, PartitionerKind};
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

pub use local::LocalPartitioner;
pub use unstructured::UnstructuredPartitioner;

/// Errors raised while partitioning a document.
#[derive(Debug, Error)]
pub enum PartitionError {
    /// The document could not be read from disk.
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),
    /// The document is not a parseable PDF.
    #[error("failed to parse PDF: {0}")]
    Parse(String),
    /// The remote partition service failed or answered unexpectedly.
    #[error("partition service error: {0}")]
    Service(String),
    /// Partitioner configuration was incomplete.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

/// One text fragment emitted by a partitioner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Fragment text, possibly empty.
    pub text: String,
    /// 1-based page number, when the partitioner reports one.
    pub page_number: Option<u32>,
}

impl Element {
    /// Convenience constructor for a fragment on a known page.
    pub fn on_page(page_number: u32, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page_number: Some(page_number),
        }
    }
}

/// Options forwarded with each partition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionOptions {
    /// Extraction strategy.
    pub strategy: ExtractionStrategy,
    /// Whether table structure should be inferred.
    pub infer_table_structure: bool,
}

/// Interface implemented by PDF partitioning backends.
#[async_trait]
pub trait Partitioner: Send + Sync {
    /// Split a document into page-tagged text elements, in reading order.
    async fn partition(
        &self,
        path: &Path,
        options: PartitionOptions,
    ) -> Result<Vec<Element>, PartitionError>;
}

/// Build the partitioner selected by configuration.
pub fn get_partitioner(config: &ExtractionConfig) -> Result<Box<dyn Partitioner>, PartitionError> {
    match config.partitioner {
        PartitionerKind::Local => Ok(Box::new(LocalPartitioner)),
        PartitionerKind::Unstructured => {
            let url = config.require_unstructured_url()?;
            Ok(Box::new(UnstructuredPartitioner::new(
                url,
                config.unstructured_api_key.clone(),
            )?))
        }
    }
}
