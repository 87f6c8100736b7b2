//! # Preprocessing
//!
//! Vocabulary construction and conversion of token sequences into the
//! fixed-length index rows consumed by the networks. The fitted state is
//! immutable after training and is one of the three persisted artifacts,
//! so a loaded model indexes unseen text exactly as it did at training
//! time.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Reserved index for padding positions.
pub const PAD_INDEX: u32 = 0;
/// Reserved index for out-of-vocabulary words.
pub const UNK_INDEX: u32 = 1;
/// Reserved tag vocabulary entry for padding positions.
pub const PAD_TAG: &str = "<pad>";

/// Fitted vocabularies and the fixed input length.
///
/// Word keys are lowercased; indexing of unseen text maps unknown words to
/// [`UNK_INDEX`]. The fit happens once, on the training corpus; inference
/// goes through the same instance read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    word_index: HashMap<String, u32>,
    char_index: HashMap<String, u32>,
    tag_index: HashMap<String, u32>,
    tags: Vec<String>,
    maxlen: usize,
}

impl Preprocessor {
    /// Fit word and character vocabularies on the training sentences.
    ///
    /// `vocab_init` seeds extra words ahead of the corpus scan, so a model
    /// can reserve indices for words it expects at inference time.
    pub fn fit(sentences: &[Vec<String>], maxlen: usize, vocab_init: Option<&[String]>) -> Self {
        let mut preprocessor = Self {
            word_index: HashMap::new(),
            char_index: HashMap::new(),
            tag_index: HashMap::new(),
            tags: vec![PAD_TAG.to_string()],
            maxlen,
        };
        preprocessor.tag_index.insert(PAD_TAG.to_string(), 0);

        if let Some(seed_words) = vocab_init {
            for word in seed_words {
                preprocessor.intern_word(word);
            }
        }
        for sentence in sentences {
            for word in sentence {
                preprocessor.intern_word(word);
            }
        }
        preprocessor
    }

    /// Fit word, character and tag vocabularies for sequence labelling.
    ///
    /// Tags are collected sorted, so the tag indices do not depend on
    /// corpus order.
    pub fn fit_with_labels(
        sentences: &[Vec<String>],
        labels: &[Vec<String>],
        maxlen: usize,
        vocab_init: Option<&[String]>,
    ) -> Self {
        let mut preprocessor = Self::fit(sentences, maxlen, vocab_init);

        let mut unique: Vec<&String> = labels.iter().flatten().collect();
        unique.sort();
        unique.dedup();
        for tag in unique {
            let next = preprocessor.tags.len() as u32;
            preprocessor.tag_index.insert(tag.clone(), next);
            preprocessor.tags.push(tag.clone());
        }
        preprocessor
    }

    fn intern_word(&mut self, word: &str) {
        let key = word.to_lowercase();
        let next = (self.word_index.len() + 2) as u32;
        self.word_index.entry(key).or_insert(next);

        for c in word.chars() {
            let next = (self.char_index.len() + 2) as u32;
            self.char_index.entry(c.to_string()).or_insert(next);
        }
    }

    /// Word vocabulary size including the two reserved indices.
    pub fn vocab_size(&self) -> usize {
        self.word_index.len() + 2
    }

    /// Character vocabulary size including the two reserved indices.
    pub fn char_vocab_size(&self) -> usize {
        self.char_index.len() + 2
    }

    /// Tag vocabulary size including the padding tag.
    pub fn num_tags(&self) -> usize {
        self.tags.len()
    }

    /// Fixed input length.
    pub fn maxlen(&self) -> usize {
        self.maxlen
    }

    /// Iterate over `(word, index)` pairs of the fitted word vocabulary,
    /// for embedding matrix filtering.
    pub fn words(&self) -> impl Iterator<Item = (String, usize)> + '_ {
        self.word_index
            .iter()
            .map(|(word, &index)| (word.clone(), index as usize))
    }

    /// Index of one word in the fitted vocabulary, unknown words mapping
    /// to [`UNK_INDEX`].
    pub fn word_id(&self, word: &str) -> u32 {
        self.word_index
            .get(&word.to_lowercase())
            .copied()
            .unwrap_or(UNK_INDEX)
    }

    /// Convert token sequences into fixed-length index rows,
    /// right-truncated and padded to `maxlen`.
    pub fn to_sequences(&self, sentences: &[Vec<String>]) -> Vec<Vec<u32>> {
        sentences
            .iter()
            .map(|sentence| {
                let mut row: Vec<u32> = sentence
                    .iter()
                    .take(self.maxlen)
                    .map(|word| self.word_id(word))
                    .collect();
                row.resize(self.maxlen, PAD_INDEX);
                row
            })
            .collect()
    }

    /// Convert label sequences into fixed-length tag index rows, padded
    /// with the padding tag.
    pub fn tags_to_sequences(&self, labels: &[Vec<String>]) -> Vec<Vec<u32>> {
        labels
            .iter()
            .map(|sequence| {
                let mut row: Vec<u32> = sequence
                    .iter()
                    .take(self.maxlen)
                    .map(|tag| self.tag_index.get(tag).copied().unwrap_or(0))
                    .collect();
                row.resize(self.maxlen, 0);
                row
            })
            .collect()
    }

    /// Tag string for a tag index.
    pub fn tag_name(&self, index: usize) -> Option<&str> {
        self.tags.get(index).map(String::as_str)
    }

    /// Persist the fitted state as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    /// Load a fitted state from JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
