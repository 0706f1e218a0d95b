//! Page records and their lifecycle.
//!
//! A [`PageRecord`] is the form persisted to disk: optional fields appear as a document moves
//! through the pipeline. The typed stages ([`RawPage`] → [`CleanedPage`] → [`SummarizedPage`] →
//! [`VectorRecord`]) make that progression explicit, and [`PageRecord::into_stage`] recovers the
//! typed view from a loaded record.

pub mod store;

use crate::processing::normalize::clean_text;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Summary stored for pages that carry no usable text.
pub const NO_CONTENT_SUMMARY: &str = "No substantive content available to summarize.";

/// One page of one source document, as stored in the JSON record files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Page number within the document; `0` when the partitioner did not report one.
    pub page_num: u32,
    /// Raw extracted text: trimmed, non-empty fragments joined with newlines.
    pub content: String,
    /// Normalized text derived from `content`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_content: Option<String>,
    /// Model summary of `clean_content`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarized: Option<String>,
    /// Reporting year supplied for the whole document.
    pub year: i32,
    /// Company name derived from the source filename.
    pub company: String,
}

/// Lifecycle position of a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecordStage {
    /// Extracted, not yet cleaned.
    Raw,
    /// Carries `clean_content`.
    Cleaned,
    /// Carries `summarized`.
    Summarized,
}

/// Freshly extracted page.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPage {
    /// Page number (`0` when unknown).
    pub page_num: u32,
    /// Raw page text.
    pub content: String,
    /// Document year.
    pub year: i32,
    /// Document company.
    pub company: String,
}

/// Page with normalized text.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedPage {
    /// Fields carried over from extraction.
    pub raw: RawPage,
    /// Output of [`clean_text`] over `raw.content`.
    pub clean_content: String,
}

/// Page with a summary ready for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarizedPage {
    /// Fields carried over from cleaning.
    pub cleaned: CleanedPage,
    /// Summary text, never blank.
    pub summarized: String,
}

/// Typed view over a [`PageRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum StagedRecord {
    /// See [`RawPage`].
    Raw(RawPage),
    /// See [`CleanedPage`].
    Cleaned(CleanedPage),
    /// See [`SummarizedPage`].
    Summarized(SummarizedPage),
}

/// Embedded page headed for the vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    /// Generated unique identifier.
    pub id: String,
    /// Embedding of the page summary.
    pub vector: Vec<f32>,
    /// Metadata stored next to the vector.
    pub metadata: VectorMetadata,
}

/// Metadata persisted with each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    /// Company name.
    pub company: String,
    /// Document year.
    pub year: i32,
    /// Page number.
    pub page: u32,
    /// Page summary that was embedded.
    pub summarized: String,
    /// Cleaned page text.
    pub content: String,
}

impl PageRecord {
    /// Create an unprocessed record.
    pub fn new(page_num: u32, content: String, year: i32, company: impl Into<String>) -> Self {
        Self {
            page_num,
            content,
            clean_content: None,
            summarized: None,
            year,
            company: company.into(),
        }
    }

    /// Furthest lifecycle stage this record has reached.
    pub fn stage(&self) -> RecordStage {
        if self.summarized.is_some() {
            RecordStage::Summarized
        } else if self.clean_content.is_some() {
            RecordStage::Cleaned
        } else {
            RecordStage::Raw
        }
    }

    /// Whether the record has cleaned text worth sending to the summarizer.
    pub fn has_substantive_content(&self) -> bool {
        self.clean_content
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }

    /// Convert into the typed stage view.
    pub fn into_stage(self) -> StagedRecord {
        let PageRecord {
            page_num,
            content,
            clean_content,
            summarized,
            year,
            company,
        } = self;
        let raw = RawPage {
            page_num,
            content,
            year,
            company,
        };

        match (clean_content, summarized) {
            (clean_content, Some(summary)) => {
                let cleaned = CleanedPage {
                    raw,
                    clean_content: clean_content.unwrap_or_default(),
                };
                StagedRecord::Summarized(cleaned.with_summary(summary))
            }
            (Some(clean_content), None) => StagedRecord::Cleaned(CleanedPage { raw, clean_content }),
            (None, None) => StagedRecord::Raw(raw),
        }
    }
}

impl RawPage {
    /// Apply the text normalizer.
    pub fn clean(self) -> CleanedPage {
        let clean_content = clean_text(&self.content);
        CleanedPage {
            raw: self,
            clean_content,
        }
    }
}

impl CleanedPage {
    /// Attach a summary, substituting [`NO_CONTENT_SUMMARY`] when either the summary or the
    /// cleaned text is blank.
    pub fn with_summary(self, summary: impl Into<String>) -> SummarizedPage {
        let summary = summary.into();
        let summarized = if self.clean_content.trim().is_empty() || summary.trim().is_empty() {
            NO_CONTENT_SUMMARY.to_string()
        } else {
            summary.trim().to_string()
        };
        SummarizedPage {
            cleaned: self,
            summarized,
        }
    }

    /// Attach the sentinel summary without consulting a model.
    pub fn without_content(self) -> SummarizedPage {
        SummarizedPage {
            cleaned: self,
            summarized: NO_CONTENT_SUMMARY.to_string(),
        }
    }
}

impl SummarizedPage {
    /// Page number of the underlying record.
    pub fn page_num(&self) -> u32 {
        self.cleaned.raw.page_num
    }

    /// Pair the page with its embedding under a freshly generated identifier.
    pub fn embed(self, vector: Vec<f32>) -> VectorRecord {
        let SummarizedPage {
            cleaned: CleanedPage { raw, clean_content },
            summarized,
        } = self;
        VectorRecord {
            id: Uuid::new_v4().to_string(),
            vector,
            metadata: VectorMetadata {
                company: raw.company,
                year: raw.year,
                page: raw.page_num,
                summarized,
                content: clean_content,
            },
        }
    }
}

impl From<RawPage> for PageRecord {
    fn from(page: RawPage) -> Self {
        PageRecord::new(page.page_num, page.content, page.year, page.company)
    }
}

impl From<CleanedPage> for PageRecord {
    fn from(page: CleanedPage) -> Self {
        let CleanedPage { raw, clean_content } = page;
        PageRecord {
            clean_content: Some(clean_content),
            ..PageRecord::from(raw)
        }
    }
}

impl From<SummarizedPage> for PageRecord {
    fn from(page: SummarizedPage) -> Self {
        let SummarizedPage {
            cleaned,
            summarized,
        } = page;
        PageRecord {
            summarized: Some(summarized),
            ..PageRecord::from(cleaned)
        }
    }
}

impl From<StagedRecord> for PageRecord {
    fn from(staged: StagedRecord) -> Self {
        match staged {
            StagedRecord::Raw(page) => page.into(),
            StagedRecord::Cleaned(page) => page.into(),
            StagedRecord::Summarized(page) => page.into(),
        }
    }
}
