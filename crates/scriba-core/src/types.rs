//! Corpus container types shared by all readers.

use serde::{Deserialize, Serialize};

/// An annotated corpus as two parallel, index-aligned sequences.
///
/// Sentence `i` of [`sentences`](Self::sentences) pairs with sequence `i`
/// of [`labels`](Self::labels), and the two inner sequences have the same
/// length. The split representation matches the bulk consumption pattern
/// of the preprocessor; every producer and consumer must keep the two
/// sides aligned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    /// Token sequences, one per sentence, in document order.
    pub sentences: Vec<Vec<String>>,
    /// BIO label sequences, index-aligned with `sentences`.
    pub labels: Vec<Vec<String>>,
}

impl Corpus {
    /// Create an empty corpus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sentence and its label sequence.
    pub fn push(&mut self, tokens: Vec<String>, labels: Vec<String>) {
        debug_assert_eq!(tokens.len(), labels.len());
        self.sentences.push(tokens);
        self.labels.push(labels);
    }

    /// Number of sentences.
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    /// True if the corpus holds no sentences.
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Iterate over aligned (tokens, labels) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&[String], &[String])> {
        self.sentences
            .iter()
            .map(Vec::as_slice)
            .zip(self.labels.iter().map(Vec::as_slice))
    }

    /// Check the alignment invariant: outer lengths match and every
    /// sentence has exactly one label per token.
    pub fn is_aligned(&self) -> bool {
        self.sentences.len() == self.labels.len()
            && self
                .iter()
                .all(|(tokens, labels)| tokens.len() == labels.len())
    }
}

/// A corpus plus the per-token feature columns of a CRF matrix file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrfMatrix {
    /// Tokens and normalized IOB2 labels.
    pub corpus: Corpus,
    /// For each sentence, for each token, the feature fields between the
    /// token and its tag.
    pub features: Vec<Vec<Vec<String>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_push_and_alignment() {
        let mut corpus = Corpus::new();
        corpus.push(s(&["EU", "rejects"]), s(&["B-ORG", "O"]));
        corpus.push(s(&["Peter"]), s(&["B-PER"]));
        assert_eq!(corpus.len(), 2);
        assert!(corpus.is_aligned());
    }

    #[test]
    fn test_misalignment_is_detected() {
        let corpus = Corpus {
            sentences: vec![s(&["a", "b"])],
            labels: vec![s(&["O"])],
        };
        assert!(!corpus.is_aligned());
    }

    #[test]
    fn test_iter_pairs() {
        let mut corpus = Corpus::new();
        corpus.push(s(&["a"]), s(&["O"]));
        let pairs: Vec<_> = corpus.iter().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0[0], "a");
        assert_eq!(pairs[0].1[0], "O");
    }
}
