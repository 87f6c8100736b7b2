//! # Scriba Models
//!
//! Model lifecycle for the Scriba NLP toolkit: preprocessing, pretrained
//! embeddings lookup, the citation sentiment classifier and the sequence
//! tagger, with train / k-fold train / predict / evaluate / save / load.
//!
//! A trained model persists as a directory named after the model holding
//! exactly three artifacts: the fitted preprocessor, the model
//! configuration and the network weights. `load` refuses a directory with
//! any of the three missing.

use std::path::PathBuf;

pub mod classifier;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod eval;
mod network;
pub mod preprocess;
pub mod sequence;
pub mod split;

// Re-export primary API
pub use classifier::Classifier;
pub use config::{ClassifierConfig, SequenceConfig, TrainingConfig};
pub use embeddings::WordEmbeddings;
pub use error::{ModelError, Result};
pub use eval::{ClassificationReport, SequenceReport};
pub use preprocess::Preprocessor;
pub use sequence::{Annotation, EntityMention, SequenceTagger};
pub use split::holdout_split;

/// File name of the persisted model configuration.
pub const CONFIG_FILE: &str = "config.json";
/// File name of the persisted preprocessor state.
pub const PREPROCESSOR_FILE: &str = "preprocessor.json";
/// File name of the persisted network weights.
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Check that one of the three persisted artifacts exists.
pub(crate) fn require_artifact(path: PathBuf) -> error::Result<PathBuf> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(error::ModelError::ArtifactMissing(path))
    }
}
