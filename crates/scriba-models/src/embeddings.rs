//! # Pretrained Word Embeddings
//!
//! Vector lookup service over a text-format embeddings file (GloVe /
//! word2vec text layout): one word per line followed by its vector
//! components, with an optional `count dim` header line. The service is a
//! plain word to vector map; anything smarter stays outside the toolkit.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::info;

use crate::error::{ModelError, Result};

/// A vocabulary-to-vector map loaded from a pretrained embeddings file.
#[derive(Debug, Clone, Default)]
pub struct WordEmbeddings {
    vectors: HashMap<String, Vec<f32>>,
    dim: usize,
}

impl WordEmbeddings {
    /// An empty lookup with zero dimensionality. Filtering an empty lookup
    /// yields an all-zero matrix.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load vectors from a text-format embeddings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let embeddings = Self::from_reader(BufReader::new(file))?;
        info!(
            words = embeddings.vectors.len(),
            dim = embeddings.dim,
            path = %path.display(),
            "loaded embeddings"
        );
        Ok(embeddings)
    }

    /// Load vectors from any buffered reader.
    ///
    /// The first line may be a `count dim` header (two integer fields); it
    /// is skipped. Every other line is `word v_0 .. v_d`. A line whose
    /// vector width disagrees with the rest fails the load.
    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut vectors = HashMap::new();
        let mut dim = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }

            let mut fields = line.split_whitespace();
            let word = match fields.next() {
                Some(word) => word,
                None => continue,
            };
            let values: Vec<f32> = fields
                .map(|v| {
                    v.parse::<f32>().map_err(|_| {
                        ModelError::Embeddings(format!(
                            "non-numeric vector component {v:?} at line {}",
                            line_no + 1
                        ))
                    })
                })
                .collect::<Result<_>>()?;

            // word2vec text files open with a "count dim" header line.
            if line_no == 0 && values.len() == 1 && word.parse::<usize>().is_ok() {
                continue;
            }
            if values.is_empty() {
                return Err(ModelError::Embeddings(format!(
                    "no vector components at line {}",
                    line_no + 1
                )));
            }

            if dim == 0 {
                dim = values.len();
            } else if values.len() != dim {
                return Err(ModelError::Embeddings(format!(
                    "inconsistent vector width at line {}: expected {dim}, got {}",
                    line_no + 1,
                    values.len()
                )));
            }
            vectors.insert(word.to_string(), values);
        }

        Ok(Self { vectors, dim })
    }

    /// Vector width, zero for an empty lookup.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of words in the lookup.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// True if the lookup holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Look up the vector for a word.
    pub fn get(&self, word: &str) -> Option<&[f32]> {
        self.vectors.get(word).map(Vec::as_slice)
    }

    /// Build the dense embedding matrix for a fitted vocabulary.
    ///
    /// `words` yields `(word, index)` pairs with indices below
    /// `vocab_size`; `dim` is the target vector width. Rows for the
    /// padding and unknown indices and for out-of-vocabulary words stay
    /// zero. Returns the matrix as a flat row-major buffer.
    pub fn filtered(
        &self,
        words: impl Iterator<Item = (String, usize)>,
        vocab_size: usize,
        dim: usize,
    ) -> Result<Vec<f32>> {
        if self.dim != 0 && self.dim != dim {
            return Err(ModelError::Embeddings(format!(
                "embedding width mismatch: file has {}, model expects {dim}",
                self.dim
            )));
        }

        let mut matrix = vec![0.0f32; vocab_size * dim];
        let mut hits = 0usize;
        for (word, index) in words {
            debug_assert!(index < vocab_size);
            if let Some(vector) = self.get(&word) {
                matrix[index * dim..(index + 1) * dim].copy_from_slice(vector);
                hits += 1;
            }
        }
        info!(vocab = vocab_size, covered = hits, "filtered embeddings to vocabulary");
        Ok(matrix)
    }
}
