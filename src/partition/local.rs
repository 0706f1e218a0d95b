use super::{Element, PartitionError, PartitionOptions, Partitioner};
use crate::config::ExtractionStrategy;
use async_trait::async_trait;
use lopdf::Document;
use std::path::{Path, PathBuf};

/// In-process partitioner reading the embedded PDF text layer.
///
/// Each non-empty line of a page becomes one element. Scanned pages without a text layer yield
/// no elements.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalPartitioner;

#[async_trait]
impl Partitioner for LocalPartitioner {
    async fn partition(
        &self,
        path: &Path,
        options: PartitionOptions,
    ) -> Result<Vec<Element>, PartitionError> {
        if options.strategy == ExtractionStrategy::HiRes || options.infer_table_structure {
            tracing::debug!(
                strategy = options.strategy.as_str(),
                infer_table_structure = options.infer_table_structure,
                "Local partitioner reads the text layer only; layout options ignored"
            );
        }

        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || extract_elements(&path))
            .await
            .map_err(|error| PartitionError::Parse(format!("extraction task failed: {error}")))?
    }
}

fn extract_elements(path: &Path) -> Result<Vec<Element>, PartitionError> {
    let bytes = std::fs::read(path)?;
    let document =
        Document::load_mem(&bytes).map_err(|error| PartitionError::Parse(error.to_string()))?;

    let mut elements = Vec::new();
    for page_number in document.get_pages().into_keys() {
        match document.extract_text(&[page_number]) {
            Ok(text) => elements.extend(
                text.lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(|line| Element::on_page(page_number, line)),
            ),
            Err(error) => {
                tracing::warn!(
                    document = %path.display(),
                    page = page_number,
                    error = %error,
                    "Failed to extract page text"
                );
            }
        }
    }
    Ok(elements)
}
