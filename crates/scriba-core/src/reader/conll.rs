//! # CoNLL Reader
//!
//! Line-oriented reader for tab-separated `token\ttag` files with blank
//! lines as sentence boundaries, the CoNLL 2003 layout.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{CorpusError, Result};
use crate::tags::repair_bio;
use crate::types::Corpus;

/// Document separator marker: lines starting with it end a sentence and
/// are otherwise skipped.
const DOCSTART: &str = "-DOCSTART-";

/// Read a CoNLL corpus file.
///
/// Each non-blank line holds exactly `token\ttag`; a blank line or a
/// `-DOCSTART-` marker ends the current sentence. A line with any other
/// field count fails the whole read with [`CorpusError::Format`]. Orphan
/// `I-` tags (IOB1-style input) are repaired to `B-`.
pub fn read_conll_file(path: impl AsRef<Path>) -> Result<Corpus> {
    let path = path.as_ref();
    let file = File::open(path)?;
    parse_lines(BufReader::new(file), &path.to_string_lossy())
}

/// Read a CoNLL corpus held in memory. Same parsing as the file entry
/// point.
pub fn read_conll_str(content: &str) -> Result<Corpus> {
    parse_lines(std::io::Cursor::new(content), "<string>")
}

fn parse_lines(reader: impl BufRead, path: &str) -> Result<Corpus> {
    let mut corpus = Corpus::new();
    let mut tokens: Vec<String> = Vec::new();
    let mut tags: Vec<String> = Vec::new();

    let flush = |tokens: &mut Vec<String>, tags: &mut Vec<String>, corpus: &mut Corpus| {
        if !tokens.is_empty() {
            let mut labels = std::mem::take(tags);
            repair_bio(&mut labels);
            corpus.push(std::mem::take(tokens), labels);
        }
    };

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();

        if line.is_empty() || line.starts_with(DOCSTART) {
            flush(&mut tokens, &mut tags, &mut corpus);
            continue;
        }

        let mut fields = line.split('\t');
        let (word, tag) = match (fields.next(), fields.next(), fields.next()) {
            (Some(word), Some(tag), None) => (word, tag),
            _ => {
                return Err(CorpusError::Format {
                    path: path.to_string(),
                    line: line_no + 1,
                    reason: format!(
                        "expected 2 tab-separated fields, got {}",
                        line.split('\t').count()
                    ),
                });
            }
        };
        tokens.push(word.to_string());
        tags.push(tag.to_string());
    }
    flush(&mut tokens, &mut tags, &mut corpus);

    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::is_well_formed_bio;

    #[test]
    fn test_two_sentences() {
        let content = "EU\tB-ORG\nrejects\tO\nGerman\tB-MISC\n\nPeter\tB-PER\nBlackburn\tI-PER\n\n";
        let corpus = read_conll_str(content).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.sentences[0], vec!["EU", "rejects", "German"]);
        assert_eq!(corpus.labels[1], vec!["B-PER", "I-PER"]);
        assert!(corpus.is_aligned());
    }

    #[test]
    fn test_docstart_is_a_boundary() {
        let content = "-DOCSTART-\t-X-\nEU\tB-ORG\n\nrejects\tO\n";
        let corpus = read_conll_str(content).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.sentences[0], vec!["EU"]);
    }

    #[test]
    fn test_trailing_sentence_without_blank_line() {
        let content = "EU\tB-ORG\nrejects\tO";
        let corpus = read_conll_str(content).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.sentences[0].len(), 2);
    }

    #[test]
    fn test_wrong_field_count_fails() {
        let content = "EU\tB-ORG\textra\n";
        let err = read_conll_str(content).unwrap_err();
        match err {
            CorpusError::Format { line, .. } => assert_eq!(line, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_tag_fails() {
        let content = "EU\n";
        assert!(read_conll_str(content).is_err());
    }

    #[test]
    fn test_iob1_input_is_repaired() {
        // CoNLL 2003 ships IOB1 tags where a sentence may open with I-.
        let content = "EU\tI-ORG\nCouncil\tI-ORG\n\n";
        let corpus = read_conll_str(content).unwrap();
        assert_eq!(corpus.labels[0], vec!["B-ORG", "I-ORG"]);
        assert!(is_well_formed_bio(&corpus.labels[0]));
    }
}
