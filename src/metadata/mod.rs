//! Deterministic metadata injection and filename-convention parsing.
//!
//! Every chunk persisted to the index carries a trailing fixed-layout
//! metadata block so the downstream query layer can cite title, author, year
//! and the *printed* page number (not the PDF index) without guessing.
//!
//! The literal labels in the block — in particular `"Internal Pagination:"` —
//! are a durable contract: the downstream response parser detects
//! source-citation answers by searching for them verbatim. The coupling is
//! fragile but deliberate; do not rephrase the labels.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, warn};

const UNKNOWN: &str = "Unknown";

/// Metadata attached to every chunk entering the index.
///
/// Fields degrade to the literal `"Unknown"` when absent, empty, or
/// whitespace-only; building one never fails, so a malformed source name can
/// never block ingestion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub title: String,
    pub author: String,
    pub year: String,
    /// The printed page number inside the document, when detected.
    pub internal_page_number: String,
}

impl Default for ChunkMetadata {
    fn default() -> Self {
        Self {
            title: UNKNOWN.to_string(),
            author: UNKNOWN.to_string(),
            year: UNKNOWN.to_string(),
            internal_page_number: UNKNOWN.to_string(),
        }
    }
}

impl ChunkMetadata {
    /// Builds validated metadata, normalizing each field.
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        year: impl Into<String>,
        internal_page_number: impl Into<String>,
    ) -> Self {
        Self {
            title: normalize_field(title.into()),
            author: normalize_field(author.into()),
            year: normalize_field(year.into()),
            internal_page_number: normalize_field(internal_page_number.into()),
        }
    }
}

/// Trims a field value, substituting `"Unknown"` for blank input.
fn normalize_field(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Appends the fixed-layout metadata block to a chunk.
///
/// The input chunk is trimmed first; an empty or whitespace-only chunk is
/// returned unchanged so a metadata-only chunk can never reach the index.
pub fn inject_metadata(chunk_text: &str, metadata: &ChunkMetadata) -> String {
    if chunk_text.trim().is_empty() {
        warn!("skipping metadata injection for empty chunk");
        return chunk_text.to_string();
    }

    let rule = "-".repeat(50);
    format!(
        "{}\n\n{rule}\n**SOURCE METADATA FOR FORENSIC EXTRACTION:**\n\
         Title: {}\nAuthor: {}\nYear: {}\nInternal Pagination: {}\n{rule}\n",
        chunk_text.trim(),
        metadata.title,
        metadata.author,
        metadata.year,
        metadata.internal_page_number,
    )
}

static FILENAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    // Optional leading 4-digit year, optional author segment, then the title;
    // the segments are hyphen-separated.
    Regex::new(r"^(?:(\d{4})\s*-\s*)?(?:(.*?)\s*-\s*)?(.*)$").expect("hard-coded pattern compiles")
});

/// Extracts (year, author, title) from the `"YYYY - Author - Title.pdf"`
/// naming convention.
///
/// Non-conforming names never corrupt the result: missing segments fall back
/// to `"Unknown"`, and the full stem serves as the title of last resort.
pub fn parse_filename_metadata(file_name: &str) -> (String, String, String) {
    let stem = file_name.trim_end_matches(".pdf").trim();

    let mut year = UNKNOWN.to_string();
    let mut author = UNKNOWN.to_string();
    let mut title = stem.to_string();

    if let Some(captures) = FILENAME_PATTERN.captures(stem) {
        let captured_year = captures.get(1).map(|m| m.as_str().trim());
        let captured_author = captures
            .get(2)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty());
        let captured_title = captures
            .get(3)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty());

        if let Some(y) = captured_year {
            year = y.to_string();
        }
        if let Some(a) = captured_author {
            author = a.to_string();
        }
        match (captured_author, captured_title) {
            (_, Some(t)) => title = t.to_string(),
            // "Author - " with nothing after: the author segment was really
            // the title.
            (Some(a), None) => {
                title = a.to_string();
                author = UNKNOWN.to_string();
            }
            (None, None) => {}
        }
    }

    debug!(%year, %author, %title, "parsed filename metadata");
    (year, author, title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_every_field() {
        let enriched = inject_metadata("body", &ChunkMetadata::default());
        assert!(enriched.starts_with("body\n\n"));
        assert!(enriched.contains("Title: Unknown\n"));
        assert!(enriched.contains("Author: Unknown\n"));
        assert!(enriched.contains("Year: Unknown\n"));
        assert!(enriched.contains("Internal Pagination: Unknown\n"));
    }

    #[test]
    fn block_layout_is_stable() {
        let metadata = ChunkMetadata::new("Carriage of Goods", "Smith", "2019", "59");
        let enriched = inject_metadata("The carrier is liable.", &metadata);
        let rule = "-".repeat(50);
        let expected = format!(
            "The carrier is liable.\n\n{rule}\n\
             **SOURCE METADATA FOR FORENSIC EXTRACTION:**\n\
             Title: Carriage of Goods\nAuthor: Smith\nYear: 2019\n\
             Internal Pagination: 59\n{rule}\n"
        );
        assert_eq!(enriched, expected);
    }

    #[test]
    fn empty_chunk_is_a_no_op() {
        assert_eq!(inject_metadata("", &ChunkMetadata::default()), "");
        assert_eq!(inject_metadata("   ", &ChunkMetadata::default()), "   ");
    }

    #[test]
    fn blank_fields_degrade_to_unknown() {
        let metadata = ChunkMetadata::new("  ", "", "2020", "  12 ");
        assert_eq!(metadata.title, "Unknown");
        assert_eq!(metadata.author, "Unknown");
        assert_eq!(metadata.year, "2020");
        assert_eq!(metadata.internal_page_number, "12");
    }

    #[test]
    fn full_convention_parses() {
        let (year, author, title) =
            parse_filename_metadata("2019 - Smith - Carriage of Goods.pdf");
        assert_eq!(year, "2019");
        assert_eq!(author, "Smith");
        assert_eq!(title, "Carriage of Goods");
    }

    #[test]
    fn author_title_without_year() {
        let (year, author, title) = parse_filename_metadata("Smith - Maritime Liens.pdf");
        assert_eq!(year, "Unknown");
        assert_eq!(author, "Smith");
        assert_eq!(title, "Maritime Liens");
    }

    #[test]
    fn bare_title_survives() {
        let (year, author, title) = parse_filename_metadata("Maritime Liens.pdf");
        assert_eq!(year, "Unknown");
        assert_eq!(author, "Unknown");
        assert_eq!(title, "Maritime Liens");
    }

    #[test]
    fn trailing_hyphen_falls_back_to_title() {
        let (year, author, title) = parse_filename_metadata("Maritime Liens - .pdf");
        assert_eq!(year, "Unknown");
        assert_eq!(author, "Unknown");
        assert_eq!(title, "Maritime Liens");
    }
}
