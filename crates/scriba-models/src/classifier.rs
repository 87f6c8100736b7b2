//! # Text Classifier Wrapper
//!
//! Lifecycle wrapper for the citation sentiment task: configure, train
//! (single run or k-fold ensemble), predict, persist, reload. All state is
//! instance-owned; the only shared artifact is the model directory on
//! disk.

use std::path::{Path, PathBuf};

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use tracing::info;

use scriba_core::tokenize;

use crate::config::{ClassifierConfig, TrainingConfig};
use crate::embeddings::WordEmbeddings;
use crate::error::{ModelError, Result};
use crate::eval::{ClassificationReport, classification_report};
use crate::network::{
    TextClassifierNet, classifier_predictions, classifier_probabilities, fit_classifier,
    seed_embeddings,
};
use crate::preprocess::Preprocessor;
use crate::split::{kfold_partition, train_val_split};
use crate::{CONFIG_FILE, PREPROCESSOR_FILE, WEIGHTS_FILE, require_artifact};

struct FoldModel {
    net: TextClassifierNet,
    varmap: VarMap,
    val_accuracy: Option<f32>,
}

impl std::fmt::Debug for FoldModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoldModel")
            .field("net", &self.net)
            .field("val_accuracy", &self.val_accuracy)
            .finish()
    }
}

/// Sentiment classifier over citation sentences.
///
/// Constructed in a configured state; `train`/`train_nfold` or `load`
/// move it to a state where `predict`, `eval` and `save` are available.
#[derive(Debug)]
pub struct Classifier {
    config: ClassifierConfig,
    training: TrainingConfig,
    embeddings: Option<WordEmbeddings>,
    preprocessor: Option<Preprocessor>,
    models: Vec<FoldModel>,
    device: Device,
}

impl Classifier {
    /// Create a configured, untrained classifier.
    pub fn new(
        config: ClassifierConfig,
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
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// True once the wrapper holds a trained or loaded model.
    pub fn is_ready(&self) -> bool {
        self.preprocessor.is_some() && !self.models.is_empty()
    }

    /// Train a single model, holding out the configured validation
    /// fraction for early stopping.
    pub fn train(&mut self, x: &[String], y: &[String], vocab_init: Option<&[String]>) -> Result<()> {
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
        x: &[String],
        y: &[String],
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

    /// Tokenize, fit the preprocessor and index the training texts.
    fn prepare_training(
        &mut self,
        x: &[String],
        y: &[String],
        vocab_init: Option<&[String]>,
    ) -> Result<(Vec<Vec<u32>>, Vec<u32>)> {
        if x.is_empty() || x.len() != y.len() {
            return Err(ModelError::InvalidParameter(format!(
                "need aligned non-empty training data, got {} texts and {} labels",
                x.len(),
                y.len()
            )));
        }
        if self.embeddings.is_none() {
            return Err(ModelError::Configuration(
                "no embeddings service configured, construct the classifier with embeddings \
                 before training"
                    .into(),
            ));
        }

        let targets = y
            .iter()
            .map(|class| self.class_index(class))
            .collect::<Result<Vec<u32>>>()?;

        let tokenized: Vec<Vec<String>> = x.iter().map(|text| tokenize(text)).collect();
        let preprocessor = Preprocessor::fit(&tokenized, self.config.maxlen, vocab_init);
        self.config.vocab_size = preprocessor.vocab_size();
        let rows = preprocessor.to_sequences(&tokenized);
        self.preprocessor = Some(preprocessor);

        Ok((rows, targets))
    }

    fn class_index(&self, class: &str) -> Result<u32> {
        self.config
            .classes
            .iter()
            .position(|known| known == class)
            .map(|index| index as u32)
            .ok_or_else(|| {
                ModelError::InvalidParameter(format!("unknown class label {class:?}"))
            })
    }

    /// Build one fresh model over the current vocabulary and fit it on
    /// the given index partition.
    fn fit_one(
        &self,
        rows: &[Vec<u32>],
        targets: &[u32],
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

        let gather = |indices: &[usize]| -> (Vec<Vec<u32>>, Vec<u32>) {
            (
                indices.iter().map(|&i| rows[i].clone()).collect(),
                indices.iter().map(|&i| targets[i]).collect(),
            )
        };
        let (x_train, y_train) = gather(train_idx);
        let (x_val, y_val) = gather(val_idx);

        let val_accuracy = fit_classifier(
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

    fn build_network(&self, matrix: Option<Vec<f32>>) -> Result<(TextClassifierNet, VarMap)> {
        if self.config.vocab_size == 0 {
            return Err(ModelError::Configuration(
                "vocabulary size is zero, the model was never fitted".into(),
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
        let net = TextClassifierNet::new(
            vb,
            self.config.vocab_size,
            self.config.word_embedding_size,
            self.config.hidden_size,
            self.config.classes.len(),
            self.config.dropout,
        )?;
        Ok((net, varmap))
    }

    fn index_texts(&self, texts: &[String]) -> Result<Vec<Vec<u32>>> {
        let preprocessor = self.preprocessor.as_ref().ok_or(ModelError::ModelNotFound)?;
        if self.models.is_empty() {
            return Err(ModelError::ModelNotFound);
        }
        let tokenized: Vec<Vec<String>> = texts.iter().map(|text| tokenize(text)).collect();
        Ok(preprocessor.to_sequences(&tokenized))
    }

    /// Per-class probabilities for each text, averaged over the ensemble.
    pub fn predict_proba(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let rows = self.index_texts(texts)?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut summed: Vec<Vec<f32>> = Vec::new();
        for model in &self.models {
            let probabilities = classifier_probabilities(&model.net, &rows, &self.device)?;
            if summed.is_empty() {
                summed = probabilities;
            } else {
                for (sum, row) in summed.iter_mut().zip(probabilities) {
                    for (s, p) in sum.iter_mut().zip(row) {
                        *s += p;
                    }
                }
            }
        }
        let count = self.models.len() as f32;
        for row in &mut summed {
            for score in row.iter_mut() {
                *score /= count;
            }
        }
        Ok(summed)
    }

    /// Predicted class name for each text.
    pub fn predict(&self, texts: &[String]) -> Result<Vec<String>> {
        let probabilities = self.predict_proba(texts)?;
        Ok(probabilities
            .into_iter()
            .map(|row| {
                let best = row
                    .iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| a.total_cmp(b))
                    .map(|(index, _)| index)
                    .unwrap_or(0);
                self.config.classes[best].clone()
            })
            .collect())
    }

    /// Evaluate on a labelled test set.
    pub fn eval(&self, x_test: &[String], y_test: &[String]) -> Result<ClassificationReport> {
        if x_test.len() != y_test.len() {
            return Err(ModelError::InvalidParameter(
                "test texts and labels are not aligned".into(),
            ));
        }
        let rows = self.index_texts(x_test)?;
        let gold = y_test
            .iter()
            .map(|class| self.class_index(class).map(|i| i as usize))
            .collect::<Result<Vec<usize>>>()?;

        // Single-model fast path scores from argmax, ensembles from the
        // averaged probabilities.
        let predicted: Vec<usize> = if self.models.len() == 1 {
            classifier_predictions(&self.models[0].net, &rows, &self.device)?
                .into_iter()
                .map(|p| p as usize)
                .collect()
        } else {
            self.predict(x_test)?
                .iter()
                .map(|class| self.class_index(class).map(|i| i as usize))
                .collect::<Result<Vec<usize>>>()?
        };

        Ok(classification_report(&gold, &predicted, &self.config.classes))
    }

    /// Persist the three model artifacts under `<dir>/<model_name>/`.
    ///
    /// For an ensemble the fold with the best validation accuracy is the
    /// one persisted.
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

    /// Load a persisted classifier from `<dir>/<model_name>/`.
    ///
    /// All three artifacts must be present; a missing file fails the load
    /// before anything is read.
    pub fn load(dir_path: impl AsRef<Path>, model_name: &str) -> Result<Self> {
        let directory = dir_path.as_ref().join(model_name);
        let config_path = require_artifact(directory.join(CONFIG_FILE))?;
        let preprocessor_path = require_artifact(directory.join(PREPROCESSOR_FILE))?;
        let weights_path = require_artifact(directory.join(WEIGHTS_FILE))?;

        let config = ClassifierConfig::load(config_path)?;
        let preprocessor = Preprocessor::load(preprocessor_path)?;

        let mut classifier = Self {
            config,
            training: TrainingConfig::default(),
            embeddings: None,
            preprocessor: Some(preprocessor),
            models: Vec::new(),
            device: Device::Cpu,
        };
        let (net, mut varmap) = classifier.build_network(None)?;
        varmap.load(weights_path)?;
        classifier.models = vec![FoldModel { net, varmap, val_accuracy: None }];
        info!(model = %classifier.config.model_name, "model loaded");
        Ok(classifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn toy_embeddings() -> WordEmbeddings {
        let content = "\
good 1.0 0.0 0.0 0.0
great 0.9 0.1 0.0 0.0
bad -1.0 0.0 0.0 0.0
awful -0.9 -0.1 0.0 0.0
paper 0.0 0.0 0.5 0.5
";
        WordEmbeddings::from_reader(Cursor::new(content)).unwrap()
    }

    fn toy_config() -> ClassifierConfig {
        ClassifierConfig::new("citations-test", vec!["negative".into(), "positive".into()])
            .unwrap()
            .with_word_embedding_size(4)
            .unwrap()
            .with_maxlen(6)
            .unwrap()
            .with_hidden_size(8)
            .unwrap()
    }

    fn toy_training() -> TrainingConfig {
        TrainingConfig {
            batch_size: 4,
            max_epoch: 60,
            learning_rate: 5e-2,
            patience: 60,
            ..Default::default()
        }
    }

    fn toy_corpus() -> (Vec<String>, Vec<String>) {
        let x = vec![
            "good paper".to_string(),
            "great great paper".to_string(),
            "a good and great paper".to_string(),
            "good good great".to_string(),
            "bad paper".to_string(),
            "awful awful paper".to_string(),
            "a bad and awful paper".to_string(),
            "bad bad awful".to_string(),
        ];
        let y = vec![
            "positive".to_string(),
            "positive".to_string(),
            "positive".to_string(),
            "positive".to_string(),
            "negative".to_string(),
            "negative".to_string(),
            "negative".to_string(),
            "negative".to_string(),
        ];
        (x, y)
    }

    #[test]
    fn test_predict_before_train_is_a_state_error() {
        let classifier =
            Classifier::new(toy_config(), toy_training(), toy_embeddings()).unwrap();
        let err = classifier.predict(&["some text".to_string()]).unwrap_err();
        assert!(matches!(err, ModelError::ModelNotFound));
    }

    #[test]
    fn test_train_nfold_rejects_zero_folds() {
        let mut classifier =
            Classifier::new(toy_config(), toy_training(), toy_embeddings()).unwrap();
        let (x, y) = toy_corpus();
        let err = classifier.train_nfold(&x, &y, 0, None).unwrap_err();
        assert!(matches!(err, ModelError::InvalidParameter(_)));
    }

    #[test]
    fn test_unknown_class_label_is_rejected() {
        let mut classifier =
            Classifier::new(toy_config(), toy_training(), toy_embeddings()).unwrap();
        let x = vec!["text".to_string()];
        let y = vec!["meh".to_string()];
        assert!(matches!(
            classifier.train(&x, &y, None),
            Err(ModelError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_train_predict_save_load_round_trip() {
        let (x, y) = toy_corpus();
        let mut classifier =
            Classifier::new(toy_config(), toy_training(), toy_embeddings()).unwrap();
        classifier.train(&x, &y, None).unwrap();
        assert!(classifier.is_ready());

        let probabilities = classifier.predict_proba(&x).unwrap();
        assert_eq!(probabilities.len(), x.len());
        assert_eq!(probabilities[0].len(), 2);

        let dir = std::env::temp_dir().join(format!("scriba-clf-{}", std::process::id()));
        let saved = classifier.save(&dir).unwrap();
        assert!(saved.join(CONFIG_FILE).is_file());
        assert!(saved.join(PREPROCESSOR_FILE).is_file());
        assert!(saved.join(WEIGHTS_FILE).is_file());

        let loaded = Classifier::load(&dir, "citations-test").unwrap();
        let reloaded = loaded.predict_proba(&x).unwrap();
        for (a, b) in probabilities.iter().zip(&reloaded) {
            for (p, q) in a.iter().zip(b) {
                assert!((p - q).abs() < 1e-5);
            }
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_loaded_wrapper_cannot_retrain_without_embeddings() {
        let (x, y) = toy_corpus();
        let mut classifier =
            Classifier::new(toy_config(), toy_training(), toy_embeddings()).unwrap();
        classifier.train(&x, &y, None).unwrap();
        let dir = std::env::temp_dir().join(format!("scriba-clf-re-{}", std::process::id()));
        classifier.save(&dir).unwrap();

        let mut loaded = Classifier::load(&dir, "citations-test").unwrap();
        assert!(matches!(
            loaded.train(&x, &y, None),
            Err(ModelError::Configuration(_))
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_rejects_incomplete_artifact() {
        let dir = std::env::temp_dir().join(format!("scriba-clf-missing-{}", std::process::id()));
        let model_dir = dir.join("citations-test");
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(model_dir.join(CONFIG_FILE), "{}").unwrap();

        let err = Classifier::load(&dir, "citations-test").unwrap_err();
        assert!(matches!(err, ModelError::ArtifactMissing(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_nfold_ensemble_trains_and_predicts() {
        let (x, y) = toy_corpus();
        let mut classifier =
            Classifier::new(toy_config(), toy_training(), toy_embeddings()).unwrap();
        classifier.train_nfold(&x, &y, 2, None).unwrap();
        assert_eq!(classifier.models.len(), 2);

        let predictions = classifier.predict(&x).unwrap();
        assert_eq!(predictions.len(), x.len());
        for class in &predictions {
            assert!(class == "negative" || class == "positive");
        }
    }

    #[test]
    fn test_eval_report_shape() {
        let (x, y) = toy_corpus();
        let mut classifier =
            Classifier::new(toy_config(), toy_training(), toy_embeddings()).unwrap();
        classifier.train(&x, &y, None).unwrap();
        let report = classifier.eval(&x, &y).unwrap();
        assert_eq!(report.classes.len(), 2);
        assert!(report.accuracy >= 0.0 && report.accuracy <= 1.0);
    }
}
