//! # Model and Training Configuration
//!
//! One immutable configuration record per model family, validated at
//! construction, plus the shared training hyperparameters. The model
//! configuration is one of the three artifacts persisted with every
//! trained model.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Configuration for a citation sentiment classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Model name; also the artifact subdirectory name.
    pub model_name: String,
    /// Architecture label recorded in the artifact.
    pub model_type: String,
    /// Output classes, in score order.
    pub classes: Vec<String>,
    /// Width of the word embedding vectors.
    pub word_embedding_size: usize,
    /// Width of the hidden dense layer.
    pub hidden_size: usize,
    /// Dropout probability applied after pooling during training.
    pub dropout: f32,
    /// Fixed input length; token sequences are right-truncated or padded.
    pub maxlen: usize,
    /// Word vocabulary size. Zero until training fits the preprocessor.
    pub vocab_size: usize,
}

impl ClassifierConfig {
    /// Create a validated configuration with the toolkit defaults.
    pub fn new(model_name: impl Into<String>, classes: Vec<String>) -> Result<Self> {
        let config = Self {
            model_name: model_name.into(),
            model_type: "gru".to_string(),
            classes,
            word_embedding_size: 300,
            hidden_size: 64,
            dropout: 0.5,
            maxlen: 300,
            vocab_size: 0,
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the fixed input length.
    pub fn with_maxlen(mut self, maxlen: usize) -> Result<Self> {
        self.maxlen = maxlen;
        self.validate()?;
        Ok(self)
    }

    /// Set the word embedding width (must match the embeddings service).
    pub fn with_word_embedding_size(mut self, size: usize) -> Result<Self> {
        self.word_embedding_size = size;
        self.validate()?;
        Ok(self)
    }

    /// Set the hidden layer width.
    pub fn with_hidden_size(mut self, size: usize) -> Result<Self> {
        self.hidden_size = size;
        self.validate()?;
        Ok(self)
    }

    /// Check the configuration invariants.
    pub fn validate(&self) -> Result<()> {
        if self.model_name.is_empty() {
            return Err(ModelError::Configuration("model_name is empty".into()));
        }
        if self.classes.len() < 2 {
            return Err(ModelError::Configuration(format!(
                "need at least 2 classes, got {}",
                self.classes.len()
            )));
        }
        validate_dims(self.word_embedding_size, self.hidden_size, self.maxlen, self.dropout)
    }

    /// Persist as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load from JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Configuration for a sequence labelling model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceConfig {
    /// Model name; also the artifact subdirectory name.
    pub model_name: String,
    /// Architecture label recorded in the artifact.
    pub model_type: String,
    /// Width of the word embedding vectors.
    pub word_embedding_size: usize,
    /// Width of the hidden dense layer.
    pub hidden_size: usize,
    /// Dropout probability applied to token states during training.
    pub dropout: f32,
    /// Fixed input length; token sequences are right-truncated or padded.
    pub maxlen: usize,
    /// Word vocabulary size. Zero until training fits the preprocessor.
    pub vocab_size: usize,
    /// Tag vocabulary size. Zero until training fits the preprocessor.
    pub num_tags: usize,
}

impl SequenceConfig {
    /// Create a validated configuration with the toolkit defaults.
    pub fn new(model_name: impl Into<String>) -> Result<Self> {
        let config = Self {
            model_name: model_name.into(),
            model_type: "gru".to_string(),
            word_embedding_size: 300,
            hidden_size: 100,
            dropout: 0.5,
            maxlen: 120,
            vocab_size: 0,
            num_tags: 0,
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the fixed input length.
    pub fn with_maxlen(mut self, maxlen: usize) -> Result<Self> {
        self.maxlen = maxlen;
        self.validate()?;
        Ok(self)
    }

    /// Set the word embedding width (must match the embeddings service).
    pub fn with_word_embedding_size(mut self, size: usize) -> Result<Self> {
        self.word_embedding_size = size;
        self.validate()?;
        Ok(self)
    }

    /// Set the hidden layer width.
    pub fn with_hidden_size(mut self, size: usize) -> Result<Self> {
        self.hidden_size = size;
        self.validate()?;
        Ok(self)
    }

    /// Check the configuration invariants.
    pub fn validate(&self) -> Result<()> {
        if self.model_name.is_empty() {
            return Err(ModelError::Configuration("model_name is empty".into()));
        }
        validate_dims(self.word_embedding_size, self.hidden_size, self.maxlen, self.dropout)
    }

    /// Persist as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load from JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn validate_dims(embedding: usize, hidden: usize, maxlen: usize, dropout: f32) -> Result<()> {
    if embedding == 0 || hidden == 0 || maxlen == 0 {
        return Err(ModelError::Configuration(
            "embedding, hidden and maxlen sizes must be non-zero".into(),
        ));
    }
    if !(0.0..1.0).contains(&dropout) {
        return Err(ModelError::Configuration(format!(
            "dropout must be in [0, 1), got {dropout}"
        )));
    }
    Ok(())
}

/// Training hyperparameters shared by both model families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Minibatch size.
    pub batch_size: usize,
    /// Upper bound on training epochs.
    pub max_epoch: usize,
    /// AdamW learning rate.
    pub learning_rate: f64,
    /// Early stop after this many epochs without validation improvement.
    pub patience: usize,
    /// Held-out validation fraction used when not training k-fold.
    pub validation_split: f32,
    /// Seed for shuffles and fold partitions.
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            max_epoch: 50,
            learning_rate: 1e-3,
            patience: 5,
            validation_split: 0.1,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    /// Validate the hyperparameter combination.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.max_epoch == 0 {
            return Err(ModelError::Configuration(
                "batch_size and max_epoch must be non-zero".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(ModelError::Configuration(format!(
                "validation_split must be in [0, 1), got {}",
                self.validation_split
            )));
        }
        if self.learning_rate <= 0.0 {
            return Err(ModelError::Configuration(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Vec<String> {
        vec!["negative".into(), "neutral".into(), "positive".into()]
    }

    #[test]
    fn test_classifier_defaults_are_valid() {
        let config = ClassifierConfig::new("citations", classes()).unwrap();
        assert_eq!(config.maxlen, 300);
        assert_eq!(config.vocab_size, 0);
    }

    #[test]
    fn test_invalid_combinations_rejected_at_construction() {
        assert!(ClassifierConfig::new("", classes()).is_err());
        assert!(ClassifierConfig::new("m", vec!["only".into()]).is_err());
        assert!(
            ClassifierConfig::new("m", classes())
                .unwrap()
                .with_maxlen(0)
                .is_err()
        );
        assert!(SequenceConfig::new("ner").unwrap().with_hidden_size(0).is_err());
    }

    #[test]
    fn test_training_config_validation() {
        assert!(TrainingConfig::default().validate().is_ok());
        let bad = TrainingConfig { batch_size: 0, ..Default::default() };
        assert!(bad.validate().is_err());
        let bad = TrainingConfig { validation_split: 1.5, ..Default::default() };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_round_trip() {
        let dir = std::env::temp_dir().join(format!("scriba-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let config = SequenceConfig::new("ner").unwrap().with_maxlen(64).unwrap();
        config.save(&path).unwrap();
        let loaded = SequenceConfig::load(&path).unwrap();
        assert_eq!(config, loaded);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
