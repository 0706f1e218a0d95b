//! JSON persistence for per-document record collections.

use super::PageRecord;
use crate::processing::types::PipelineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One array element of a record file.
///
/// Entries that do not match the [`PageRecord`] shape are retained verbatim so rewriting the file
/// never drops data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredEntry {
    /// Well-formed page record.
    Record(PageRecord),
    /// Entry missing required fields or carrying wrong types.
    Malformed(Value),
}

/// Contents of one `<stem>_<year>.json` file.
#[derive(Debug, Clone)]
pub struct RecordFile {
    /// Location the file was loaded from and will be saved to.
    pub path: PathBuf,
    /// Entries in file order.
    pub entries: Vec<StoredEntry>,
}

impl RecordFile {
    /// Wrap freshly built records for a new output file.
    pub fn new(path: impl Into<PathBuf>, records: Vec<PageRecord>) -> Self {
        Self {
            path: path.into(),
            entries: records.into_iter().map(StoredEntry::Record).collect(),
        }
    }

    /// Read and parse a record file, logging a warning for each malformed entry.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let bytes = fs::read(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<StoredEntry> =
            serde_json::from_slice(&bytes).map_err(|source| PipelineError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let file = Self {
            path: path.to_path_buf(),
            entries,
        };
        for error in file.format_errors() {
            tracing::warn!(error = %error, "Skipping malformed record");
        }
        Ok(file)
    }

    /// Serialize the entries back to disk as a pretty-printed JSON array.
    pub fn save(&self) -> Result<(), PipelineError> {
        let json =
            serde_json::to_vec_pretty(&self.entries).map_err(|source| PipelineError::Json {
                path: self.path.clone(),
                source,
            })?;
        fs::write(&self.path, json).map_err(|source| PipelineError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Well-formed records, in file order.
    pub fn records(&self) -> impl Iterator<Item = &PageRecord> {
        self.entries.iter().filter_map(|entry| match entry {
            StoredEntry::Record(record) => Some(record),
            StoredEntry::Malformed(_) => None,
        })
    }

    /// Mutable access to well-formed records, in file order.
    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut PageRecord> {
        self.entries.iter_mut().filter_map(|entry| match entry {
            StoredEntry::Record(record) => Some(record),
            StoredEntry::Malformed(_) => None,
        })
    }

    /// Consume the file, keeping only well-formed records.
    pub fn into_records(self) -> Vec<PageRecord> {
        self.entries
            .into_iter()
            .filter_map(|entry| match entry {
                StoredEntry::Record(record) => Some(record),
                StoredEntry::Malformed(_) => None,
            })
            .collect()
    }

    /// One [`PipelineError::RecordFormat`] per malformed entry.
    pub fn format_errors(&self) -> Vec<PipelineError> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| match entry {
                StoredEntry::Record(_) => None,
                StoredEntry::Malformed(value) => Some(PipelineError::RecordFormat {
                    location: format!("{}[{index}]", self.path.display()),
                    reason: describe_malformed(value),
                }),
            })
            .collect()
    }
}

/// List `.json` files directly under `dir`, sorted by file name.
pub fn list_record_files(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    list_files_with_extension(dir, "json")
}

pub(crate) fn list_files_with_extension(
    dir: &Path,
    extension: &str,
) -> Result<Vec<PathBuf>, PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    Ok(files)
}

fn describe_malformed(value: &Value) -> String {
    let Some(object) = value.as_object() else {
        return "entry is not a JSON object".into();
    };
    let missing: Vec<&str> = ["page_num", "content", "year", "company"]
        .into_iter()
        .filter(|field| !object.contains_key(*field))
        .collect();
    if missing.is_empty() {
        "entry has fields with unexpected types".into()
    } else {
        format!("missing required fields: {}", missing.join(", "))
    }
}
