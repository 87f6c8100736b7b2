//! # Simple Word Tokenizer
//!
//! Splits raw text into word and punctuation tokens. This is the single
//! tokenization used everywhere in the toolkit, so corpus labels, model
//! inputs and annotation offsets all line up on the same token boundaries.

use serde::{Deserialize, Serialize};

/// A token extracted from the input text with positional information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The token text content.
    pub text: String,
    /// Start byte offset in the original string.
    pub start: usize,
    /// End byte offset in the original string (exclusive).
    pub end: usize,
    /// Token index in the sequence.
    pub index: usize,
}

/// Tokenize a text into plain token strings.
///
/// Runs of alphanumeric characters form word tokens; every other
/// non-whitespace character becomes a token of its own. Deterministic and
/// side-effect free.
///
/// # Examples
/// ```
/// use scriba_core::tokenizer::tokenize;
///
/// let tokens = tokenize("bla CENSURED, bla");
/// assert_eq!(tokens, vec!["bla", "CENSURED", ",", "bla"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    tokenize_with_offsets(text)
        .into_iter()
        .map(|t| t.text)
        .collect()
}

/// Tokenize a text, keeping the byte offsets of every token.
///
/// Used by the sequence tagger to map predicted entity spans back onto the
/// original string.
pub fn tokenize_with_offsets(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word_start: Option<usize> = None;

    let flush = |tokens: &mut Vec<Token>, start: usize, end: usize| {
        if start < end {
            tokens.push(Token {
                text: text[start..end].to_string(),
                start,
                end,
                index: 0,
            });
        }
    };

    for (pos, c) in text.char_indices() {
        if c.is_alphanumeric() {
            if word_start.is_none() {
                word_start = Some(pos);
            }
        } else {
            if let Some(start) = word_start.take() {
                flush(&mut tokens, start, pos);
            }
            if !c.is_whitespace() {
                flush(&mut tokens, pos, pos + c.len_utf8());
            }
        }
    }
    if let Some(start) = word_start {
        flush(&mut tokens, start, text.len());
    }

    for (i, token) in tokens.iter_mut().enumerate() {
        token.index = i;
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize("bla CENSURED bla");
        assert_eq!(tokens, vec!["bla", "CENSURED", "bla"]);
    }

    #[test]
    fn test_punctuation_is_split_off() {
        let tokens = tokenize("you are a CENSURED, and");
        assert_eq!(tokens, vec!["you", "are", "a", "CENSURED", ",", "and"]);
    }

    #[test]
    fn test_hyphen_splits_words() {
        let tokens = tokenize("Covid-19");
        assert_eq!(tokens, vec!["Covid", "-", "19"]);
    }

    #[test]
    fn test_empty_and_whitespace_only() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  \t \n ").is_empty());
    }

    #[test]
    fn test_offsets_index_back_into_text() {
        let text = "President Obama is not speaking.";
        let tokens = tokenize_with_offsets(text);
        for token in &tokens {
            assert_eq!(&text[token.start..token.end], token.text);
        }
        assert_eq!(tokens[0].index, 0);
        assert_eq!(tokens.last().unwrap().text, ".");
    }

    #[test]
    fn test_offsets_with_multibyte_chars() {
        let text = "café au lait";
        let tokens = tokenize_with_offsets(text);
        assert_eq!(tokens[0].text, "café");
        assert_eq!(&text[tokens[1].start..tokens[1].end], "au");
    }
}
