//! Summarization pass over record files.

use crate::{
    processing::types::{PipelineError, SummaryReport},
    records::{
        NO_CONTENT_SUMMARY, PageRecord,
        store::{RecordFile, list_record_files},
    },
    summarization::SummarizationClient,
};
use std::path::Path;

/// Fills the `summarized` field of page records.
pub struct Summarizer {
    client: Box<dyn SummarizationClient>,
    overwrite: bool,
}

impl Summarizer {
    /// Create a summarizer that keeps existing summaries.
    pub fn new(client: Box<dyn SummarizationClient>) -> Self {
        Self {
            client,
            overwrite: false,
        }
    }

    /// Regenerate summaries even when a record already carries one.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Summarize records in place.
    ///
    /// Records without cleaned text receive the sentinel without a model call. A failed model
    /// call leaves the record unsummarized so a later pass can retry it.
    pub async fn summarize_records<'a, I>(&self, records: I) -> SummaryReport
    where
        I: IntoIterator<Item = &'a mut PageRecord>,
    {
        let mut report = SummaryReport::default();
        for record in records {
            if !self.overwrite
                && record
                    .summarized
                    .as_deref()
                    .is_some_and(|summary| !summary.trim().is_empty())
            {
                report.kept += 1;
                continue;
            }

            let Some(content) = record
                .clean_content
                .as_deref()
                .filter(|text| !text.trim().is_empty())
            else {
                record.summarized = Some(NO_CONTENT_SUMMARY.to_string());
                report.sentinel += 1;
                continue;
            };

            match self.client.summarize(content).await {
                Ok(summary) if summary.trim().is_empty() => {
                    record.summarized = Some(NO_CONTENT_SUMMARY.to_string());
                    report.sentinel += 1;
                }
                Ok(summary) => {
                    record.summarized = Some(summary.trim().to_string());
                    report.summarized += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        company = %record.company,
                        page = record.page_num,
                        error = %error,
                        "Summarization failed; record left unsummarized"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Summarize one record file and write it back after the full pass.
    pub async fn summarize_file(&self, path: &Path) -> Result<SummaryReport, PipelineError> {
        let mut file = RecordFile::load(path)?;
        tracing::info!(file = %path.display(), "Summarizing record file");
        let report = self.summarize_records(file.records_mut()).await;
        file.save()?;
        tracing::info!(
            file = %path.display(),
            summarized = report.summarized,
            sentinel = report.sentinel,
            kept = report.kept,
            failed = report.failed,
            "Record file summarized"
        );
        Ok(report)
    }

    /// Summarize every `.json` file of a directory, continuing past per-file failures.
    pub async fn summarize_dir(&self, dir: &Path) -> Result<SummaryReport, PipelineError> {
        let mut report = SummaryReport::default();
        for path in list_record_files(dir)? {
            match self.summarize_file(&path).await {
                Ok(file_report) => report.absorb(file_report),
                Err(error) => {
                    tracing::error!(file = %path.display(), error = %error, "Record file failed");
                    report.failed_files += 1;
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarization::SummarizationClientError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct EchoClient {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SummarizationClient for EchoClient {
        async fn summarize(&self, content: &str) -> Result<String, SummarizationClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match content {
                "fail" => Err(SummarizationClientError::GenerationFailed("boom".into())),
                "blank" => Ok("   ".into()),
                other => Ok(format!(" summary of {other} ")),
            }
        }
    }

    fn summarizer() -> (Summarizer, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = EchoClient {
            calls: Arc::clone(&calls),
        };
        (Summarizer::new(Box::new(client)), calls)
    }

    fn record(page: u32, clean: Option<&str>, summary: Option<&str>) -> PageRecord {
        PageRecord {
            clean_content: clean.map(str::to_string),
            summarized: summary.map(str::to_string),
            ..PageRecord::new(page, "raw".into(), 2024, "Acme")
        }
    }

    #[tokio::test]
    async fn empty_content_gets_sentinel_without_model_call() {
        let (summarizer, calls) = summarizer();
        let mut records = vec![record(1, Some("   "), None), record(2, None, None)];

        let report = summarizer.summarize_records(records.iter_mut()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.sentinel, 2);
        for record in &records {
            assert_eq!(record.summarized.as_deref(), Some(NO_CONTENT_SUMMARY));
        }
    }

    #[tokio::test]
    async fn summaries_are_trimmed_and_blank_answers_become_sentinel() {
        let (summarizer, _) = summarizer();
        let mut records = vec![record(1, Some("revenue"), None), record(2, Some("blank"), None)];

        summarizer.summarize_records(records.iter_mut()).await;

        assert_eq!(records[0].summarized.as_deref(), Some("summary of revenue"));
        assert_eq!(records[1].summarized.as_deref(), Some(NO_CONTENT_SUMMARY));
    }

    #[tokio::test]
    async fn failures_leave_record_unsummarized_and_pass_continues() {
        let (summarizer, _) = summarizer();
        let mut records = vec![record(1, Some("fail"), None), record(2, Some("risk"), None)];

        let report = summarizer.summarize_records(records.iter_mut()).await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.summarized, 1);
        assert!(records[0].summarized.is_none());
        assert_eq!(records[1].summarized.as_deref(), Some("summary of risk"));
    }

    #[tokio::test]
    async fn existing_summaries_are_kept_unless_overwriting() {
        let (summarizer, calls) = summarizer();
        let mut records = vec![record(1, Some("revenue"), Some("already done"))];
        let report = summarizer.summarize_records(records.iter_mut()).await;
        assert_eq!(report.kept, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let summarizer = summarizer.with_overwrite(true);
        summarizer.summarize_records(records.iter_mut()).await;
        assert_eq!(records[0].summarized.as_deref(), Some("summary of revenue"));
    }

    #[tokio::test]
    async fn file_pass_preserves_malformed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Acme_2024.json");
        std::fs::write(
            &path,
            r#"[
                {"page_num": 1, "content": "raw", "clean_content": "revenue", "year": 2024, "company": "Acme"},
                {"page_num": "two", "note": "broken"}
            ]"#,
        )
        .unwrap();

        let (summarizer, _) = summarizer();
        let report = summarizer.summarize_dir(dir.path()).await.unwrap();
        assert_eq!(report.summarized, 1);

        let saved: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(saved[0]["summarized"], "summary of revenue");
        assert_eq!(saved[1]["note"], "broken");
    }

    #[tokio::test]
    async fn unreadable_file_is_counted_and_pass_continues() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_broken.json"), "{").unwrap();
        let good = dir.path().join("b_good_2024.json");
        let mut record = PageRecord::new(1, "raw".into(), 2024, "Good");
        record.clean_content = Some("revenue".into());
        RecordFile::new(&good, vec![record]).save().unwrap();

        let (summarizer, _) = summarizer();
        let report = summarizer.summarize_dir(dir.path()).await.unwrap();

        assert_eq!(report.failed_files, 1);
        assert_eq!(report.summarized, 1);
        let records = RecordFile::load(&good).unwrap().into_records();
        assert_eq!(records[0].summarized.as_deref(), Some("summary of revenue"));
    }
}
