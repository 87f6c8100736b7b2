//! # Citation Sentiment Corpus Reader
//!
//! Reader for the citation sentiment corpus: tab-separated records
//! `source_id target_id polarity citation_text` with `#` comment lines,
//! one citation sentence per record.

use std::fs;
use std::path::Path;

use crate::error::{CorpusError, Result};

/// The sentiment classes, in the order used by the classifier.
pub const CITATION_CLASSES: &[&str] = &["negative", "neutral", "positive"];

/// Read the citation sentiment corpus.
///
/// Returns the citation texts and their sentiment class names, index
/// aligned. Polarity codes map `o` → neutral, `p` → positive,
/// `n` → negative; anything else, or a record with fewer than four
/// fields, fails the read.
pub fn read_citation_sentiment_file(
    path: impl AsRef<Path>,
) -> Result<(Vec<String>, Vec<String>)> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    parse_records(&content, &path.to_string_lossy())
}

/// Read a citation sentiment corpus held in memory.
pub fn read_citation_sentiment_str(content: &str) -> Result<(Vec<String>, Vec<String>)> {
    parse_records(content, "<string>")
}

fn parse_records(content: &str, path: &str) -> Result<(Vec<String>, Vec<String>)> {
    let mut texts = Vec::new();
    let mut classes = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.splitn(4, '\t').collect();
        if fields.len() != 4 {
            return Err(CorpusError::Format {
                path: path.to_string(),
                line: line_no + 1,
                reason: format!("expected 4 tab-separated fields, got {}", fields.len()),
            });
        }

        let class = match fields[2] {
            "o" => "neutral",
            "p" => "positive",
            "n" => "negative",
            other => {
                return Err(CorpusError::Format {
                    path: path.to_string(),
                    line: line_no + 1,
                    reason: format!("unknown polarity code {other:?}"),
                });
            }
        };
        texts.push(fields[3].to_string());
        classes.push(class.to_string());
    }

    Ok((texts, classes))
}
