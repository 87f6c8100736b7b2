//! # CRF Matrix Reader
//!
//! Reader for GROBID CRF training matrices: whitespace-separated lines of
//! `token feat_0 .. feat_n tag`, blank line as sentence boundary. Tags are
//! normalized from the GROBID scheme to IOB2 on the way in.

use std::fs;
use std::path::Path;

use crate::error::{CorpusError, Result};
use crate::tags::grobid_to_iob2;
use crate::types::{Corpus, CrfMatrix};

/// Read a CRF matrix file.
///
/// See [`read_crf_str`] for the record layout; both entry points share the
/// same parsing core.
pub fn read_crf_file(path: impl AsRef<Path>) -> Result<CrfMatrix> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    parse_matrix(&content, &path.to_string_lossy())
}

/// Read a CRF matrix held in memory.
///
/// Each non-blank line is `token feat_0 .. feat_n tag`, split on spaces or
/// tabs. The token is the first field, the tag the last, and the features
/// are all fields strictly between the two. A line with fewer than two
/// fields fails the read with [`CorpusError::Format`].
pub fn read_crf_str(content: &str) -> Result<CrfMatrix> {
    parse_matrix(content, "<string>")
}

fn parse_matrix(content: &str, path: &str) -> Result<CrfMatrix> {
    let mut matrix = CrfMatrix::default();
    let mut tokens: Vec<String> = Vec::new();
    let mut tags: Vec<String> = Vec::new();
    let mut features: Vec<Vec<String>> = Vec::new();

    let flush = |tokens: &mut Vec<String>,
                     tags: &mut Vec<String>,
                     features: &mut Vec<Vec<String>>,
                     matrix: &mut CrfMatrix| {
        if !tokens.is_empty() {
            matrix
                .corpus
                .push(std::mem::take(tokens), std::mem::take(tags));
            matrix.features.push(std::mem::take(features));
        }
    };

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            flush(&mut tokens, &mut tags, &mut features, &mut matrix);
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(CorpusError::Format {
                path: path.to_string(),
                line: line_no + 1,
                reason: format!("expected at least token and tag, got {} field(s)", fields.len()),
            });
        }

        tokens.push(fields[0].to_string());
        tags.push(grobid_to_iob2(fields[fields.len() - 1]));
        features.push(
            fields[1..fields.len() - 1]
                .iter()
                .map(|f| f.to_string())
                .collect(),
        );
    }
    flush(&mut tokens, &mut tags, &mut features, &mut matrix);

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_features_and_normalized_tags() {
        let content = "\
John LINESTART INITCAP I-<author>
Smith LINEIN INITCAP <author>
, LINEIN PUNCT <other>

2001 LINESTART NODIGIT I-<date>
";
        let matrix = read_crf_str(content).unwrap();
        assert_eq!(matrix.corpus.len(), 2);
        assert_eq!(matrix.corpus.sentences[0], vec!["John", "Smith", ","]);
        assert_eq!(
            matrix.corpus.labels[0],
            vec!["B-<author>", "I-<author>", "O"]
        );
        assert_eq!(matrix.corpus.labels[1], vec!["B-<date>"]);
        // All fields between token and tag are kept as features.
        assert_eq!(matrix.features[0][0], vec!["LINESTART", "INITCAP"]);
        assert_eq!(matrix.features[0][1], vec!["LINEIN", "INITCAP"]);
    }

    #[test]
    fn test_tab_separated_fields() {
        let content = "John\tLINESTART\tI-<author>\n";
        let matrix = read_crf_str(content).unwrap();
        assert_eq!(matrix.corpus.sentences[0], vec!["John"]);
        assert_eq!(matrix.features[0][0], vec!["LINESTART"]);
    }

    #[test]
    fn test_token_and_tag_only() {
        let content = "John I-<author>\n";
        let matrix = read_crf_str(content).unwrap();
        assert!(matrix.features[0][0].is_empty());
    }

    #[test]
    fn test_single_field_line_fails() {
        let content = "John\n";
        let err = read_crf_str(content).unwrap_err();
        match err {
            CorpusError::Format { line, .. } => assert_eq!(line, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_line_flushes_and_trailing_sentence_is_kept() {
        let content = "a f1 <x>\n\nb f1 <x>";
        let matrix = read_crf_str(content).unwrap();
        assert_eq!(matrix.corpus.len(), 2);
        assert_eq!(matrix.features.len(), 2);
        assert!(matrix.corpus.is_aligned());
    }
}
