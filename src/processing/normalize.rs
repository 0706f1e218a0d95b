//! Deterministic cleanup of extracted page text.
//!
//! PDF text layers carry layout debris: words hyphenated across line breaks, column padding,
//! table borders drawn with box glyphs and running page-number headers or footers. The rules
//! below strip that debris in a fixed order. The final whitespace collapse leaves a single line,
//! which makes a second pass a no-op.

use crate::records::PageRecord;
use regex::Regex;
use std::sync::LazyLock;

static HYPHENATED_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\n(\w+)").expect("hyphenation pattern is valid"));
static HORIZONTAL_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("space pattern is valid"));
static BOX_DRAWING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x{2500}-\x{257F}]").expect("box pattern is valid"));
// Intra-line whitespace is `[^\S\n]` so that any character the final collapse turns into a
// space is already accepted here.
static PAGE_NUMBER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[^\S\n]*(?:Page|PAGE)?[^\S\n]*\d+[^\S\n]*$")
        .expect("page number pattern is valid")
});
static NEWLINE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("newline pattern is valid"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Normalize raw page text into a single cleaned line.
///
/// Rules run in order, each on the previous output:
///
/// 1. rejoin words hyphenated across a line break (`capi-\ntal` → `capital`);
/// 2. collapse runs of spaces or tabs;
/// 3. drop box-drawing glyphs (U+2500–U+257F);
/// 4. drop lines holding only a page number, optionally labelled `Page`/`PAGE`;
/// 5. collapse blank-line runs;
/// 6. collapse all whitespace to single spaces and trim.
///
/// Text made only of decoration or whitespace cleans to an empty string.
pub fn clean_text(content: &str) -> String {
    let text = HYPHENATED_BREAK.replace_all(content, "$1");
    let text = HORIZONTAL_RUN.replace_all(&text, " ");
    let text = BOX_DRAWING.replace_all(&text, "");
    let text = PAGE_NUMBER_LINE.replace_all(&text, "");
    let text = NEWLINE_RUN.replace_all(&text, "\n");
    let text = WHITESPACE_RUN.replace_all(&text, " ");
    text.trim().to_string()
}

/// Populate `clean_content` for every record that carries usable text.
///
/// Records whose `content` is blank are left untouched and reported with a warning; the rest of
/// the batch is still cleaned.
pub fn clean_records(records: Vec<PageRecord>) -> Vec<PageRecord> {
    records
        .into_iter()
        .map(|mut record| {
            if record.content.trim().is_empty() {
                tracing::warn!(
                    company = %record.company,
                    page = record.page_num,
                    "Record has no usable text; skipping cleanup"
                );
                return record;
            }
            record.clean_content = Some(clean_text(&record.content));
            record
        })
        .collect()
}
