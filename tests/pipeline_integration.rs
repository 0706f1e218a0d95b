use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use finrag::{
    config::ExtractionStrategy,
    embedding::{EmbeddingClient, EmbeddingClientError},
    partition::{Element, PartitionError, PartitionOptions, Partitioner},
    processing::{
        BatchOptions, BatchProcessor, PipelineError, QueryOptions, QueryPipeline, Summarizer,
        UpsertOptions, UpsertPipeline,
    },
    qdrant::{DistanceMetric, ScoredPoint, VectorQuery, VectorStore, VectorStoreError},
    records::{NO_CONTENT_SUMMARY, PageRecord, VectorRecord, store::RecordFile},
    summarization::{SummarizationClient, SummarizationClientError},
};

const DIMENSION: usize = 8;

struct FakePartitioner {
    documents: HashMap<String, Vec<Element>>,
}

#[async_trait]
impl Partitioner for FakePartitioner {
    async fn partition(
        &self,
        path: &Path,
        _options: PartitionOptions,
    ) -> Result<Vec<Element>, PartitionError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.documents
            .get(&name)
            .cloned()
            .ok_or_else(|| PartitionError::Parse(format!("unknown document {name}")))
    }
}

struct FakeSummarizer;

#[async_trait]
impl SummarizationClient for FakeSummarizer {
    async fn summarize(&self, content: &str) -> Result<String, SummarizationClientError> {
        Ok(format!("Summary: {content}"))
    }
}

struct FakeEmbedder;

#[async_trait]
impl EmbeddingClient for FakeEmbedder {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0; DIMENSION];
                vector[text.len() % DIMENSION] = 1.0;
                vector
            })
            .collect())
    }
}

struct FailingEmbedder;

#[async_trait]
impl EmbeddingClient for FailingEmbedder {
    async fn generate_embeddings(
        &self,
        _texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        Err(EmbeddingClientError::GenerationFailed("offline".into()))
    }
}

#[derive(Default, Clone)]
struct FakeStore {
    ensured: Arc<Mutex<Vec<(String, usize, DistanceMetric)>>>,
    batches: Arc<Mutex<Vec<Vec<VectorRecord>>>>,
}

#[async_trait]
impl VectorStore for FakeStore {
    async fn ensure_index(
        &self,
        name: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<(), VectorStoreError> {
        self.ensured
            .lock()
            .unwrap()
            .push((name.to_string(), dimension, metric));
        Ok(())
    }

    async fn upsert(
        &self,
        _name: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, VectorStoreError> {
        let count = records.len();
        self.batches.lock().unwrap().push(records);
        Ok(count)
    }

    async fn query(
        &self,
        _name: &str,
        _query: VectorQuery,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        Err(VectorStoreError::InvalidUrl("store offline".into()))
    }
}

fn batch_options(root: &Path) -> BatchOptions {
    BatchOptions {
        dataset_dir: root.join("pdfs"),
        output_dir: root.join("json"),
        year: 2024,
        strategy: ExtractionStrategy::Fast,
        infer_table_structure: false,
        skip_existing: false,
    }
}

fn upsert_options() -> UpsertOptions {
    UpsertOptions {
        index_name: "financial-rag".into(),
        dimension: DIMENSION,
        batch_size: 100,
    }
}

#[tokio::test]
async fn two_page_document_becomes_cleaned_records() {
    let root = tempfile::tempdir().unwrap();
    let pdfs = root.path().join("pdfs");
    std::fs::create_dir_all(&pdfs).unwrap();
    std::fs::write(pdfs.join("Acme.pdf"), b"%PDF").unwrap();

    let partitioner = FakePartitioner {
        documents: HashMap::from([(
            "Acme.pdf".to_string(),
            vec![
                Element::on_page(1, "Revenue: -\nRs 500 crore\n\n\nPage 1"),
                Element::on_page(2, "  Net   profit  was   Rs 50   crore"),
            ],
        )]),
    };
    let processor = BatchProcessor::new(batch_options(root.path()), Box::new(partitioner));

    let report = processor.process_all().await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.written, vec![root.path().join("json/Acme_2024.json")]);

    let records = RecordFile::load(&report.written[0]).unwrap().into_records();
    let summary: Vec<(u32, Option<&str>, &str)> = records
        .iter()
        .map(|record| {
            (
                record.page_num,
                record.clean_content.as_deref(),
                record.company.as_str(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            (1, Some("Revenue: Rs 500 crore"), "Acme"),
            (2, Some("Net profit was Rs 50 crore"), "Acme"),
        ]
    );
    assert!(records.iter().all(|record| record.year == 2024));
    assert!(records.iter().all(|record| record.summarized.is_none()));
}

#[tokio::test]
async fn empty_pages_receive_sentinel_and_flow_to_the_index() {
    let root = tempfile::tempdir().unwrap();
    let path = root.path().join("Acme_2024.json");
    let mut blank = PageRecord::new(2, "│││".into(), 2024, "Acme");
    blank.clean_content = Some("   ".into());
    let mut filled = PageRecord::new(1, "Revenue".into(), 2024, "Acme");
    filled.clean_content = Some("Revenue grew 10%".into());
    RecordFile::new(&path, vec![filled, blank]).save().unwrap();

    let summarizer = Summarizer::new(Box::new(FakeSummarizer));
    let report = summarizer.summarize_dir(root.path()).await.unwrap();
    assert_eq!((report.summarized, report.sentinel), (1, 1));

    let records = RecordFile::load(&path).unwrap().into_records();
    assert_eq!(
        records[0].summarized.as_deref(),
        Some("Summary: Revenue grew 10%")
    );
    assert_eq!(records[1].summarized.as_deref(), Some(NO_CONTENT_SUMMARY));

    let store = FakeStore::default();
    let pipeline = UpsertPipeline::new(
        upsert_options(),
        Box::new(FakeEmbedder),
        Box::new(store.clone()),
    );
    let report = pipeline.run(root.path()).await.unwrap();
    assert_eq!(report.upserted, 2);
    assert_eq!(
        store.ensured.lock().unwrap().as_slice(),
        &[("financial-rag".to_string(), DIMENSION, DistanceMetric::Cosine)]
    );
}

#[tokio::test]
async fn upsert_batches_by_hundred_and_preserves_metadata() {
    let records: Vec<PageRecord> = (1..=250)
        .map(|page| {
            let company = if page % 2 == 0 { "HDFC" } else { "SBI" };
            let mut record = PageRecord::new(page, format!("page {page}"), 2023, company);
            record.clean_content = Some(format!("page {page}"));
            record.summarized = Some(format!("summary {page}"));
            record
        })
        .collect();

    let store = FakeStore::default();
    let pipeline = UpsertPipeline::new(
        upsert_options(),
        Box::new(FakeEmbedder),
        Box::new(store.clone()),
    );
    let report = pipeline.upsert_records(records).await.unwrap();

    assert_eq!(report.batches, 3);
    assert_eq!(report.upserted, 250);
    let batches = store.batches.lock().unwrap();
    let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![100, 100, 50]);

    for (index, vector) in batches.iter().flatten().enumerate() {
        let page = index as u32 + 1;
        assert_eq!(vector.metadata.page, page);
        assert_eq!(vector.metadata.year, 2023);
        let expected = if page % 2 == 0 { "HDFC" } else { "SBI" };
        assert_eq!(vector.metadata.company, expected);
        assert_eq!(vector.metadata.summarized, format!("summary {page}"));
        assert_eq!(vector.vector.len(), DIMENSION);
    }
}

#[tokio::test]
async fn missing_dataset_directory_aborts_the_batch() {
    let root = tempfile::tempdir().unwrap();
    let processor = BatchProcessor::new(
        batch_options(root.path()),
        Box::new(FakePartitioner {
            documents: HashMap::new(),
        }),
    );

    let error = processor.process_all().await.unwrap_err();
    assert!(matches!(error, PipelineError::DirectoryNotFound(path) if path == root.path().join("pdfs")));
}

#[tokio::test]
async fn query_failures_yield_no_matches() {
    let options = QueryOptions {
        index_name: "financial-rag".into(),
        dimension: DIMENSION,
    };

    let store_down = QueryPipeline::new(
        options.clone(),
        Box::new(FakeEmbedder),
        Box::new(FakeStore::default()),
    );
    assert!(store_down.query("What was net profit?", None, 5).await.is_empty());
    assert!(store_down.try_query("What was net profit?", None, 5).await.is_err());

    let embedder_down = QueryPipeline::new(
        options,
        Box::new(FailingEmbedder),
        Box::new(FakeStore::default()),
    );
    assert!(embedder_down.query("What was net profit?", None, 5).await.is_empty());
}
