//! # Sequence Labelling Wrapper
//!
//! Lifecycle wrapper for the NER task: configure, train (single run or
//! k-fold ensemble), tag raw text with byte-offset entity mentions,
//! evaluate with span-level F1, persist, reload.

use std::path::{Path, PathBuf};

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use serde::Serialize;
use tracing::info;

use scriba_core::tags::{OUTSIDE, entity_spans, repair_bio};
use scriba_core::tokenizer::tokenize_with_offsets;

use crate::config::{SequenceConfig, TrainingConfig};
use crate::embeddings::WordEmbeddings;
use crate::error::{ModelError, Result};
use crate::eval::{SequenceReport, sequence_report};
use crate::network::{
    SequenceTaggerNet, fit_tagger, seed_embeddings, tagger_predictions, tagger_probabilities,
};
use crate::preprocess::Preprocessor;
use crate::split::{kfold_partition, train_val_split};
use crate::{CONFIG_FILE, PREPROCESSOR_FILE, WEIGHTS_FILE, require_artifact};

struct FoldModel {
    net: SequenceTaggerNet,
    varmap: VarMap,
    val_accuracy: Option<f32>,
}

/// An entity mention found in a tagged text, with byte offsets into the
/// original string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMention {
    /// The mention text as it appears in the input.
    pub text: String,
    /// Entity type.
    pub label: String,
    /// Start byte offset in the input text.
    pub begin_offset: usize,
    /// End byte offset in the input text (exclusive).
    pub end_offset: usize,
}

/// Tagging result for one input text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    /// The input text.
    pub text: String,
    /// Entity mentions, in input order.
    pub entities: Vec<EntityMention>,
}

/// Sequence tagger over tokenized sentences.
pub struct SequenceTagger {
    config: SequenceConfig,
    training: TrainingConfig,
    embeddings: Option<WordEmbeddings>,
    preprocessor: Option<Preprocessor>,
    models: Vec<FoldModel>,
    device: Device,
}

impl SequenceTagger {
    /// Create a configured, untrained tagger.
    pub fn new(
        config: SequenceConfig,
        training: TrainingConfig,
        embeddings: WordEmbeddings,
    ) -> Result<Self> {
        config.validate()?;
        training.validate()?;
        Ok(Self {
            config,
            training,
            embeddings: Some(embeddings),
            preprocessor: None,
            models: Vec::new(),
            device: Device::Cpu,
        })
    }

    /// The model configuration.
    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// True once the wrapper holds a trained or loaded model.
    pub fn is_ready(&self) -> bool {
        self.preprocessor.is_some() && !self.models.is_empty()
    }

    /// Train a single model, holding out the configured validation
    /// fraction for early stopping.
    pub fn train(
        &mut self,
        x: &[Vec<String>],
        y: &[Vec<String>],
        vocab_init: Option<&[String]>,
    ) -> Result<()> {
        let (rows, targets) = self.prepare_training(x, y, vocab_init)?;
        let (train_idx, val_idx) =
            train_val_split(rows.len(), self.training.validation_split, self.training.seed);
        let model = self.fit_one(&rows, &targets, &train_idx, &val_idx)?;
        self.models = vec![model];
        Ok(())
    }

    /// Train `fold_number` independently initialized models on k-fold
    /// partitions and keep all of them as an ensemble.
    pub fn train_nfold(
        &mut self,
        x: &[Vec<String>],
        y: &[Vec<String>],
        fold_number: usize,
        vocab_init: Option<&[String]>,
    ) -> Result<()> {
        if fold_number < 1 {
            return Err(ModelError::InvalidParameter(
                "fold number should be equal or more than 1".into(),
            ));
        }
        if fold_number == 1 {
            return self.train(x, y, vocab_init);
        }

        let (rows, targets) = self.prepare_training(x, y, vocab_init)?;
        let folds = kfold_partition(rows.len(), fold_number, self.training.seed);

        let mut models = Vec::with_capacity(fold_number);
        for (fold, val_idx) in folds.iter().enumerate() {
            info!(fold = fold + 1, folds = fold_number, "training fold");
            let train_idx: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != fold)
                .flat_map(|(_, indices)| indices.iter().copied())
                .collect();
            models.push(self.fit_one(&rows, &targets, &train_idx, val_idx)?);
        }
        self.models = models;
        Ok(())
    }

    fn prepare_training(
        &mut self,
        x: &[Vec<String>],
        y: &[Vec<String>],
        vocab_init: Option<&[String]>,
    ) -> Result<(Vec<Vec<u32>>, Vec<Vec<u32>>)> {
        if x.is_empty() || x.len() != y.len() {
            return Err(ModelError::InvalidParameter(format!(
                "need aligned non-empty training data, got {} sentences and {} label sequences",
                x.len(),
                y.len()
            )));
        }
        if let Some(misaligned) = x
            .iter()
            .zip(y)
            .position(|(tokens, labels)| tokens.len() != labels.len())
        {
            return Err(ModelError::InvalidParameter(format!(
                "sentence {misaligned} has {} tokens but {} labels",
                x[misaligned].len(),
                y[misaligned].len()
            )));
        }
        if self.embeddings.is_none() {
            return Err(ModelError::Configuration(
                "no embeddings service configured, construct the tagger with embeddings before \
                 training"
                    .into(),
            ));
        }

        let preprocessor = Preprocessor::fit_with_labels(x, y, self.config.maxlen, vocab_init);
        self.config.vocab_size = preprocessor.vocab_size();
        self.config.num_tags = preprocessor.num_tags();
        let rows = preprocessor.to_sequences(x);
        let targets = preprocessor.tags_to_sequences(y);
        self.preprocessor = Some(preprocessor);

        Ok((rows, targets))
    }

    fn fit_one(
        &self,
        rows: &[Vec<u32>],
        targets: &[Vec<u32>],
        train_idx: &[usize],
        val_idx: &[usize],
    ) -> Result<FoldModel> {
        let preprocessor = self.preprocessor.as_ref().ok_or(ModelError::ModelNotFound)?;
        let embeddings = self.embeddings.as_ref().ok_or_else(|| {
            ModelError::Configuration("no embeddings service configured".into())
        })?;
        let matrix = embeddings.filtered(
            preprocessor.words(),
            self.config.vocab_size,
            self.config.word_embedding_size,
        )?;

        let (net, varmap) = self.build_network(Some(matrix))?;

        let gather = |indices: &[usize]| -> (Vec<Vec<u32>>, Vec<Vec<u32>>) {
            (
                indices.iter().map(|&i| rows[i].clone()).collect(),
                indices.iter().map(|&i| targets[i].clone()).collect(),
            )
        };
        let (x_train, y_train) = gather(train_idx);
        let (x_val, y_val) = gather(val_idx);

        let val_accuracy = fit_tagger(
            &net,
            &varmap,
            &x_train,
            &y_train,
            &x_val,
            &y_val,
            &self.training,
            &self.device,
        )?;
        Ok(FoldModel { net, varmap, val_accuracy })
    }

    fn build_network(&self, matrix: Option<Vec<f32>>) -> Result<(SequenceTaggerNet, VarMap)> {
        if self.config.vocab_size == 0 || self.config.num_tags == 0 {
            return Err(ModelError::Configuration(
                "vocabulary is empty, the model was never fitted".into(),
            ));
        }
        let varmap = VarMap::new();
        if let Some(matrix) = matrix {
            seed_embeddings(
                &varmap,
                matrix,
                self.config.vocab_size,
                self.config.word_embedding_size,
                &self.device,
            )?;
        }
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &self.device);
        let net = SequenceTaggerNet::new(
            vb,
            self.config.vocab_size,
            self.config.word_embedding_size,
            self.config.hidden_size,
            self.config.num_tags,
            self.config.dropout,
        )?;
        Ok((net, varmap))
    }

    /// Predict a BIO label per token for already-tokenized sentences.
    ///
    /// Tokens beyond the model's fixed input length come back as `O`; the
    /// output always aligns 1:1 with the input tokens and is BIO-repaired.
    pub fn predict_labels(&self, sentences: &[Vec<String>]) -> Result<Vec<Vec<String>>> {
        let preprocessor = self.preprocessor.as_ref().ok_or(ModelError::ModelNotFound)?;
        if self.models.is_empty() {
            return Err(ModelError::ModelNotFound);
        }
        if sentences.is_empty() {
            return Ok(Vec::new());
        }
        let rows = preprocessor.to_sequences(sentences);

        let tag_rows: Vec<Vec<u32>> = if self.models.len() == 1 {
            tagger_predictions(&self.models[0].net, &rows, &self.device)?
        } else {
            // Ensemble: average per-position probabilities, then argmax.
            let mut summed: Vec<Vec<Vec<f32>>> = Vec::new();
            for model in &self.models {
                let probabilities = tagger_probabilities(&model.net, &rows, &self.device)?;
                if summed.is_empty() {
                    summed = probabilities;
                } else {
                    for (sum_row, row) in summed.iter_mut().zip(probabilities) {
                        for (sum_pos, pos) in sum_row.iter_mut().zip(row) {
                            for (s, p) in sum_pos.iter_mut().zip(pos) {
                                *s += p;
                            }
                        }
                    }
                }
            }
            summed
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|scores| {
                            scores
                                .iter()
                                .enumerate()
                                .max_by(|(_, a), (_, b)| a.total_cmp(b))
                                .map(|(index, _)| index as u32)
                                .unwrap_or(0)
                        })
                        .collect()
                })
                .collect()
        };

        let mut labelled = Vec::with_capacity(sentences.len());
        for (sentence, tag_row) in sentences.iter().zip(&tag_rows) {
            let mut labels: Vec<String> = sentence
                .iter()
                .enumerate()
                .map(|(position, _)| {
                    tag_row
                        .get(position)
                        .and_then(|&tag| preprocessor.tag_name(tag as usize))
                        .filter(|name| *name != crate::preprocess::PAD_TAG)
                        .unwrap_or(OUTSIDE)
                        .to_string()
                })
                .collect();
            repair_bio(&mut labels);
            labelled.push(labels);
        }
        Ok(labelled)
    }

    /// Tag raw texts, mapping predicted entity spans back to byte offsets
    /// in each input.
    pub fn tag(&self, texts: &[String]) -> Result<Vec<Annotation>> {
        let tokenized: Vec<Vec<scriba_core::Token>> =
            texts.iter().map(|text| tokenize_with_offsets(text)).collect();
        let sentences: Vec<Vec<String>> = tokenized
            .iter()
            .map(|tokens| tokens.iter().map(|t| t.text.clone()).collect())
            .collect();
        let labelled = self.predict_labels(&sentences)?;

        let mut annotations = Vec::with_capacity(texts.len());
        for ((text, tokens), labels) in texts.iter().zip(&tokenized).zip(&labelled) {
            let entities = entity_spans(labels)
                .into_iter()
                .map(|span| {
                    let begin_offset = tokens[span.start].start;
                    let end_offset = tokens[span.end - 1].end;
                    EntityMention {
                        text: text[begin_offset..end_offset].to_string(),
                        label: span.label,
                        begin_offset,
                        end_offset,
                    }
                })
                .collect();
            annotations.push(Annotation { text: text.clone(), entities });
        }
        Ok(annotations)
    }

    /// Evaluate on a labelled test set with exact-span scoring.
    pub fn eval(&self, x_test: &[Vec<String>], y_test: &[Vec<String>]) -> Result<SequenceReport> {
        if x_test.len() != y_test.len() {
            return Err(ModelError::InvalidParameter(
                "test sentences and labels are not aligned".into(),
            ));
        }
        let predicted = self.predict_labels(x_test)?;
        Ok(sequence_report(y_test, &predicted))
    }

    /// Persist the three model artifacts under `<dir>/<model_name>/`.
    pub fn save(&self, dir_path: impl AsRef<Path>) -> Result<PathBuf> {
        let preprocessor = self.preprocessor.as_ref().ok_or(ModelError::ModelNotFound)?;
        let best = self
            .models
            .iter()
            .max_by(|a, b| {
                a.val_accuracy
                    .unwrap_or(f32::NEG_INFINITY)
                    .total_cmp(&b.val_accuracy.unwrap_or(f32::NEG_INFINITY))
            })
            .ok_or(ModelError::ModelNotFound)?;

        let directory = dir_path.as_ref().join(&self.config.model_name);
        std::fs::create_dir_all(&directory)?;

        preprocessor.save(directory.join(PREPROCESSOR_FILE))?;
        info!("preprocessor saved");
        self.config.save(directory.join(CONFIG_FILE))?;
        info!("model config saved");
        best.varmap.save(directory.join(WEIGHTS_FILE))?;
        info!("model weights saved");
        Ok(directory)
    }

    /// Load a persisted tagger from `<dir>/<model_name>/`.
    pub fn load(dir_path: impl AsRef<Path>, model_name: &str) -> Result<Self> {
        let directory = dir_path.as_ref().join(model_name);
        let config_path = require_artifact(directory.join(CONFIG_FILE))?;
        let preprocessor_path = require_artifact(directory.join(PREPROCESSOR_FILE))?;
        let weights_path = require_artifact(directory.join(WEIGHTS_FILE))?;

        let config = SequenceConfig::load(config_path)?;
        let preprocessor = Preprocessor::load(preprocessor_path)?;

        let mut tagger = Self {
            config,
            training: TrainingConfig::default(),
            embeddings: None,
            preprocessor: Some(preprocessor),
            models: Vec::new(),
            device: Device::Cpu,
        };
        let (net, mut varmap) = tagger.build_network(None)?;
        varmap.load(weights_path)?;
        tagger.models = vec![FoldModel { net, varmap, val_accuracy: None }];
        info!(model = %tagger.config.model_name, "model loaded");
        Ok(tagger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn toy_embeddings() -> WordEmbeddings {
        let content = "\
alice 1.0 0.0 0.0 0.0
bob 0.9 0.1 0.0 0.0
paris 0.0 1.0 0.0 0.0
london 0.1 0.9 0.0 0.0
visited 0.0 0.0 1.0 0.0
likes 0.0 0.0 0.9 0.1
";
        WordEmbeddings::from_reader(Cursor::new(content)).unwrap()
    }

    fn toy_config() -> SequenceConfig {
        SequenceConfig::new("ner-test")
            .unwrap()
            .with_word_embedding_size(4)
            .unwrap()
            .with_maxlen(5)
            .unwrap()
            .with_hidden_size(8)
            .unwrap()
    }

    fn toy_training() -> TrainingConfig {
        TrainingConfig {
            batch_size: 4,
            max_epoch: 120,
            learning_rate: 5e-2,
            patience: 120,
            ..Default::default()
        }
    }

    fn sentence(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn toy_corpus() -> (Vec<Vec<String>>, Vec<Vec<String>>) {
        let x = vec![
            sentence(&["Alice", "visited", "Paris"]),
            sentence(&["Bob", "visited", "London"]),
            sentence(&["Alice", "likes", "London"]),
            sentence(&["Bob", "likes", "Paris"]),
            sentence(&["Paris", "likes", "Alice"]),
            sentence(&["London", "visited", "Bob"]),
        ];
        let y = vec![
            sentence(&["B-PER", "O", "B-LOC"]),
            sentence(&["B-PER", "O", "B-LOC"]),
            sentence(&["B-PER", "O", "B-LOC"]),
            sentence(&["B-PER", "O", "B-LOC"]),
            sentence(&["B-LOC", "O", "B-PER"]),
            sentence(&["B-LOC", "O", "B-PER"]),
        ];
        (x, y)
    }

    #[test]
    fn test_tag_before_train_is_a_state_error() {
        let tagger = SequenceTagger::new(toy_config(), toy_training(), toy_embeddings()).unwrap();
        let err = tagger.tag(&["Alice visited Paris".to_string()]).unwrap_err();
        assert!(matches!(err, ModelError::ModelNotFound));
    }

    #[test]
    fn test_train_nfold_rejects_zero_folds() {
        let mut tagger =
            SequenceTagger::new(toy_config(), toy_training(), toy_embeddings()).unwrap();
        let (x, y) = toy_corpus();
        assert!(matches!(
            tagger.train_nfold(&x, &y, 0, None),
            Err(ModelError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_misaligned_training_data_is_rejected() {
        let mut tagger =
            SequenceTagger::new(toy_config(), toy_training(), toy_embeddings()).unwrap();
        let x = vec![sentence(&["a", "b"])];
        let y = vec![sentence(&["O"])];
        assert!(matches!(
            tagger.train(&x, &y, None),
            Err(ModelError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_predicted_labels_align_and_are_well_formed() {
        let (x, y) = toy_corpus();
        let mut tagger =
            SequenceTagger::new(toy_config(), toy_training(), toy_embeddings()).unwrap();
        tagger.train(&x, &y, None).unwrap();

        // Longer than maxlen: the tail still gets labels.
        let long = vec![sentence(&["Alice", "visited", "Paris", "and", "London", "and", "Bob"])];
        let labels = tagger.predict_labels(&long).unwrap();
        assert_eq!(labels[0].len(), 7);
        assert!(scriba_core::tags::is_well_formed_bio(&labels[0]));
    }

    #[test]
    fn test_tag_produces_byte_offsets() {
        let (x, y) = toy_corpus();
        let mut tagger =
            SequenceTagger::new(toy_config(), toy_training(), toy_embeddings()).unwrap();
        tagger.train(&x, &y, None).unwrap();

        let text = "Alice visited Paris".to_string();
        let annotations = tagger.tag(std::slice::from_ref(&text)).unwrap();
        assert_eq!(annotations.len(), 1);
        for mention in &annotations[0].entities {
            assert_eq!(
                &text[mention.begin_offset..mention.end_offset],
                mention.text
            );
        }
    }

    #[test]
    fn test_save_load_round_trip_preserves_predictions() {
        let (x, y) = toy_corpus();
        let mut tagger =
            SequenceTagger::new(toy_config(), toy_training(), toy_embeddings()).unwrap();
        tagger.train(&x, &y, None).unwrap();

        let before = tagger.predict_labels(&x).unwrap();

        let dir = std::env::temp_dir().join(format!("scriba-seq-{}", std::process::id()));
        tagger.save(&dir).unwrap();
        let loaded = SequenceTagger::load(&dir, "ner-test").unwrap();
        let after = loaded.predict_labels(&x).unwrap();
        assert_eq!(before, after);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_eval_reports_span_scores() {
        let (x, y) = toy_corpus();
        let mut tagger =
            SequenceTagger::new(toy_config(), toy_training(), toy_embeddings()).unwrap();
        tagger.train(&x, &y, None).unwrap();
        let report = tagger.eval(&x, &y).unwrap();
        assert!(report.f1 >= 0.0 && report.f1 <= 1.0);
        assert_eq!(report.expected, 12);
    }
}
