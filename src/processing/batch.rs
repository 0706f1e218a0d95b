//! PDF directory to JSON record files.

use crate::{
    config::{ExtractionConfig, ExtractionStrategy},
    partition::{PartitionOptions, Partitioner},
    processing::{
        normalize::clean_records,
        types::{BatchReport, PipelineError},
    },
    records::{
        PageRecord,
        store::{RecordFile, list_files_with_extension},
    },
};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for one batch conversion run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Directory scanned for `.pdf` files.
    pub dataset_dir: PathBuf,
    /// Directory receiving the record files.
    pub output_dir: PathBuf,
    /// Year stamped on every record.
    pub year: i32,
    /// Strategy forwarded to the partitioner.
    pub strategy: ExtractionStrategy,
    /// Table inference flag forwarded to the partitioner.
    pub infer_table_structure: bool,
    /// Leave documents alone when their output file already exists.
    pub skip_existing: bool,
}

impl From<&ExtractionConfig> for BatchOptions {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            dataset_dir: config.dataset_dir.clone(),
            output_dir: config.output_dir.clone(),
            year: config.year,
            strategy: config.strategy,
            infer_table_structure: config.infer_table_structure,
            skip_existing: config.skip_existing,
        }
    }
}

/// Converts every PDF of a directory into a `<stem>_<year>.json` record file.
pub struct BatchProcessor {
    options: BatchOptions,
    partitioner: Box<dyn Partitioner>,
}

impl BatchProcessor {
    /// Create a processor using the supplied partitioner.
    pub fn new(options: BatchOptions, partitioner: Box<dyn Partitioner>) -> Self {
        Self {
            options,
            partitioner,
        }
    }

    /// Settings this processor was built with.
    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// PDF files directly under the dataset directory, sorted by name.
    pub fn discover_documents(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let documents = list_files_with_extension(&self.options.dataset_dir, "pdf")?;
        if documents.is_empty() {
            tracing::warn!(
                dir = %self.options.dataset_dir.display(),
                "No PDF files found in the dataset directory"
            );
        }
        Ok(documents)
    }

    /// Partition a document and join its fragments into one text per page.
    ///
    /// Pages are returned in ascending order; fragments without a page number land on page 0.
    /// A page whose fragments are all blank is kept with empty text.
    pub async fn extract_pages(&self, path: &Path) -> Result<Vec<(u32, String)>, PipelineError> {
        if !path.is_file() {
            return Err(PipelineError::extraction(path, "file not found"));
        }

        let options = PartitionOptions {
            strategy: self.options.strategy,
            infer_table_structure: self.options.infer_table_structure,
        };
        let elements = self
            .partitioner
            .partition(path, options)
            .await
            .map_err(|error| PipelineError::extraction(path, error))?;
        if elements.is_empty() {
            return Err(PipelineError::extraction(path, "no extractable content"));
        }

        let mut pages: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for element in elements {
            let fragments = pages.entry(element.page_number.unwrap_or(0)).or_default();
            let text = element.text.trim();
            if !text.is_empty() {
                fragments.push(text.to_string());
            }
        }

        Ok(pages
            .into_iter()
            .map(|(page_num, fragments)| (page_num, fragments.join("\n")))
            .collect())
    }

    /// Build one raw record per extracted page.
    pub fn build_records(&self, pages: Vec<(u32, String)>, company: &str) -> Vec<PageRecord> {
        pages
            .into_iter()
            .map(|(page_num, content)| {
                PageRecord::new(page_num, content, self.options.year, company)
            })
            .collect()
    }

    /// Location of the record file produced for `document`.
    pub fn output_path(&self, document: &Path) -> PathBuf {
        self.options
            .output_dir
            .join(format!("{}_{}.json", document_stem(document), self.options.year))
    }

    /// Extract, clean and persist one document, returning the written path.
    pub async fn process_document(&self, path: &Path) -> Result<PathBuf, PipelineError> {
        let company = document_stem(path);
        let pages = self.extract_pages(path).await?;
        let records = clean_records(self.build_records(pages, &company));
        let output = self.output_path(path);

        tracing::debug!(
            document = %path.display(),
            pages = records.len(),
            "Extracted document"
        );
        RecordFile::new(&output, records).save()?;
        tracing::info!(output = %output.display(), "Record file saved");
        Ok(output)
    }

    /// Convert every discovered document, continuing past per-document failures.
    pub async fn process_all(&self) -> Result<BatchReport, PipelineError> {
        let documents = self.discover_documents()?;
        fs::create_dir_all(&self.options.output_dir).map_err(|source| PipelineError::Io {
            path: self.options.output_dir.clone(),
            source,
        })?;

        let total = documents.len();
        let mut report = BatchReport::default();
        let mut claimed: HashSet<PathBuf> = HashSet::new();
        for (index, document) in documents.into_iter().enumerate() {
            let output = self.output_path(&document);
            if !claimed.insert(output.clone()) {
                let error = PipelineError::OutputCollision { document, output };
                tracing::error!(error = %error, "Document failed");
                report.failed.push(error);
                continue;
            }
            if self.options.skip_existing && output.exists() {
                tracing::info!(document = %document.display(), "Output exists; skipping");
                report.skipped.push(document);
                continue;
            }

            match self.process_document(&document).await {
                Ok(output) => report.written.push(output),
                Err(error) => {
                    tracing::error!(
                        document = %document.display(),
                        error = %error,
                        "Document failed"
                    );
                    report.failed.push(error);
                }
            }
            tracing::info!(processed = index + 1, total, "Batch progress");
        }

        tracing::info!(
            written = report.written.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Batch complete"
        );
        Ok(report)
    }
}

/// File name without its extension, used as the company label.
pub(crate) fn document_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{Element, PartitionError};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MapPartitioner(HashMap<String, Vec<Element>>);

    #[async_trait]
    impl Partitioner for MapPartitioner {
        async fn partition(
            &self,
            path: &Path,
            _options: PartitionOptions,
        ) -> Result<Vec<Element>, PartitionError> {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.0
                .get(&name)
                .cloned()
                .ok_or_else(|| PartitionError::Parse(format!("cannot parse {name}")))
        }
    }

    fn processor(root: &Path, documents: &[(&str, Vec<Element>)]) -> BatchProcessor {
        let options = BatchOptions {
            dataset_dir: root.join("pdfs"),
            output_dir: root.join("json"),
            year: 2024,
            strategy: ExtractionStrategy::Fast,
            infer_table_structure: false,
            skip_existing: false,
        };
        let map = documents
            .iter()
            .map(|(name, elements)| (name.to_string(), elements.clone()))
            .collect();
        BatchProcessor::new(options, Box::new(MapPartitioner(map)))
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, b"%PDF").unwrap();
        path
    }

    #[test]
    fn discovery_is_sorted_and_case_insensitive() {
        let root = tempfile::tempdir().unwrap();
        let pdfs = root.path().join("pdfs");
        touch(&pdfs, "b.PDF");
        touch(&pdfs, "a.pdf");
        touch(&pdfs, "notes.txt");

        let found = processor(root.path(), &[]).discover_documents().unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.PDF"]);
    }

    #[test]
    fn missing_dataset_directory_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let error = processor(root.path(), &[]).discover_documents().unwrap_err();
        assert!(matches!(error, PipelineError::DirectoryNotFound(_)));
    }

    #[tokio::test]
    async fn fragments_are_grouped_by_page() {
        let root = tempfile::tempdir().unwrap();
        let path = touch(&root.path().join("pdfs"), "Acme.pdf");
        let processor = processor(
            root.path(),
            &[(
                "Acme.pdf",
                vec![
                    Element::on_page(2, "Second page"),
                    Element::on_page(1, "  Title  "),
                    Element::on_page(1, "   "),
                    Element {
                        text: "orphan".into(),
                        page_number: None,
                    },
                    Element::on_page(1, "Body"),
                    Element::on_page(3, ""),
                ],
            )],
        );

        let pages = processor.extract_pages(&path).await.unwrap();
        assert_eq!(
            pages,
            vec![
                (0, "orphan".to_string()),
                (1, "Title\nBody".to_string()),
                (2, "Second page".to_string()),
                (3, String::new()),
            ]
        );
    }

    #[tokio::test]
    async fn zero_elements_is_an_extraction_failure() {
        let root = tempfile::tempdir().unwrap();
        let path = touch(&root.path().join("pdfs"), "Empty.pdf");
        let processor = processor(root.path(), &[("Empty.pdf", Vec::new())]);

        let error = processor.extract_pages(&path).await.unwrap_err();
        assert!(
            matches!(error, PipelineError::Extraction { ref document, .. } if document == &path)
        );
    }

    #[test]
    fn output_path_uses_stem_and_year() {
        let root = tempfile::tempdir().unwrap();
        let processor = processor(root.path(), &[]);
        assert_eq!(
            processor.output_path(Path::new("/data/HDFC.annual.pdf")),
            root.path().join("json").join("HDFC.annual_2024.json")
        );
    }

    #[tokio::test]
    async fn dotted_names_keep_separate_outputs() {
        let root = tempfile::tempdir().unwrap();
        let pdfs = root.path().join("pdfs");
        touch(&pdfs, "HDFC.annual.pdf");
        touch(&pdfs, "HDFC.q1.pdf");
        let processor = processor(
            root.path(),
            &[
                ("HDFC.annual.pdf", vec![Element::on_page(1, "annual text")]),
                ("HDFC.q1.pdf", vec![Element::on_page(1, "quarter text")]),
            ],
        );

        let report = processor.process_all().await.unwrap();
        assert!(report.is_success());
        assert_eq!(
            report.written,
            vec![
                root.path().join("json/HDFC.annual_2024.json"),
                root.path().join("json/HDFC.q1_2024.json"),
            ]
        );
        let annual = RecordFile::load(&report.written[0]).unwrap().into_records();
        assert_eq!(annual[0].company, "HDFC.annual");
        assert_eq!(annual[0].content, "annual text");
    }

    #[tokio::test]
    async fn second_document_with_same_output_fails_without_overwriting() {
        let root = tempfile::tempdir().unwrap();
        let pdfs = root.path().join("pdfs");
        touch(&pdfs, "Acme.PDF");
        touch(&pdfs, "Acme.pdf");
        let processor = processor(
            root.path(),
            &[
                ("Acme.PDF", vec![Element::on_page(1, "first")]),
                ("Acme.pdf", vec![Element::on_page(1, "second")]),
            ],
        );

        let report = processor.process_all().await.unwrap();
        assert_eq!(report.written, vec![root.path().join("json/Acme_2024.json")]);
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(
            report.failed[0],
            PipelineError::OutputCollision { ref document, .. } if document.ends_with("Acme.pdf")
        ));
        let records = RecordFile::load(&report.written[0]).unwrap().into_records();
        assert_eq!(records[0].content, "first");
    }

    #[tokio::test]
    async fn batch_continues_past_failed_documents() {
        let root = tempfile::tempdir().unwrap();
        let pdfs = root.path().join("pdfs");
        touch(&pdfs, "Alpha.pdf");
        touch(&pdfs, "Broken.pdf");
        touch(&pdfs, "Gamma.pdf");
        let processor = processor(
            root.path(),
            &[
                ("Alpha.pdf", vec![Element::on_page(1, "Alpha text")]),
                ("Gamma.pdf", vec![Element::on_page(1, "Gamma text")]),
            ],
        );

        let report = processor.process_all().await.unwrap();
        assert_eq!(report.written.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert!(!report.is_success());
        assert!(root.path().join("json/Gamma_2024.json").exists());

        let records = RecordFile::load(&root.path().join("json/Alpha_2024.json"))
            .unwrap()
            .into_records();
        assert_eq!(records[0].company, "Alpha");
        assert_eq!(records[0].clean_content.as_deref(), Some("Alpha text"));
    }

    #[tokio::test]
    async fn skip_existing_leaves_converted_documents() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("pdfs"), "Alpha.pdf");
        let mut processor = processor(
            root.path(),
            &[("Alpha.pdf", vec![Element::on_page(1, "Alpha text")])],
        );
        processor.options.skip_existing = true;
        touch(&root.path().join("json"), "Alpha_2024.json");

        let report = processor.process_all().await.unwrap();
        assert!(report.written.is_empty());
        assert_eq!(report.skipped.len(), 1);
    }
}
