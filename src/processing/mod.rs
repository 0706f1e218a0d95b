//! Pipeline stages: PDF conversion, summarization, embedding upsert, and query.

pub mod batch;
mod mappers;
pub mod normalize;
pub mod query;
pub mod summarize;
pub mod types;
pub mod upsert;

pub use batch::{BatchOptions, BatchProcessor};
pub use normalize::{clean_records, clean_text};
pub use query::{DEFAULT_TOP_K, QueryOptions, QueryPipeline};
pub use summarize::Summarizer;
pub use types::{
    BatchReport, PipelineError, QueryError, QueryMatch, SummaryReport, UpsertReport,
};
pub use upsert::{UpsertOptions, UpsertPipeline};
