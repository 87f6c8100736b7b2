//! # Neural Networks
//!
//! The trainable scorers behind the two model wrappers: a pooled embedding
//! classifier and a per-token sequence tagger, both on the candle CPU
//! backend. The wrappers treat these as opaque models over index
//! sequences; the architectures are deliberately small.

use candle_core::{D, Device, Tensor, Var};
use candle_nn::{
    AdamW, Dropout, Embedding, Linear, Module, Optimizer, ParamsAdamW, VarBuilder, VarMap,
    embedding, linear, loss, ops,
};
use tracing::info;

use crate::config::TrainingConfig;
use crate::error::Result;
use crate::split::shuffled_indices;

/// VarMap key of the word embedding table.
const EMBED_KEY: &str = "embed.weight";

/// Seed a VarMap with a pretrained embedding matrix before the network is
/// built, so the embedding table starts from the pretrained vectors and
/// still trains and persists with the rest of the weights.
pub(crate) fn seed_embeddings(
    varmap: &VarMap,
    matrix: Vec<f32>,
    vocab_size: usize,
    dim: usize,
    device: &Device,
) -> Result<()> {
    let tensor = Tensor::from_vec(matrix, (vocab_size, dim), device)?;
    let var = Var::from_tensor(&tensor)?;
    varmap.data().lock().unwrap().insert(EMBED_KEY.to_string(), var);
    Ok(())
}

/// Pooled embedding classifier: embed, mean-pool, dense, output logits.
#[derive(Debug)]
pub(crate) struct TextClassifierNet {
    embed: Embedding,
    dense: Linear,
    out: Linear,
    dropout: Dropout,
}

impl TextClassifierNet {
    pub(crate) fn new(
        vb: VarBuilder,
        vocab_size: usize,
        embedding_size: usize,
        hidden_size: usize,
        num_classes: usize,
        dropout: f32,
    ) -> Result<Self> {
        Ok(Self {
            embed: embedding(vocab_size, embedding_size, vb.pp("embed"))?,
            dense: linear(embedding_size, hidden_size, vb.pp("dense"))?,
            out: linear(hidden_size, num_classes, vb.pp("out"))?,
            dropout: Dropout::new(dropout),
        })
    }

    /// Forward pass over a `(batch, maxlen)` index tensor, producing
    /// `(batch, num_classes)` logits.
    pub(crate) fn forward_t(&self, ids: &Tensor, train: bool) -> Result<Tensor> {
        let hidden = self.embed.forward(ids)?.mean(1)?;
        let hidden = self.dropout.forward(&hidden, train)?;
        let hidden = self.dense.forward(&hidden)?.relu()?;
        Ok(self.out.forward(&hidden)?)
    }
}

/// Per-token tagger: embed, dense, per-token tag logits.
pub(crate) struct SequenceTaggerNet {
    embed: Embedding,
    dense: Linear,
    out: Linear,
    dropout: Dropout,
}

impl SequenceTaggerNet {
    pub(crate) fn new(
        vb: VarBuilder,
        vocab_size: usize,
        embedding_size: usize,
        hidden_size: usize,
        num_tags: usize,
        dropout: f32,
    ) -> Result<Self> {
        Ok(Self {
            embed: embedding(vocab_size, embedding_size, vb.pp("embed"))?,
            dense: linear(embedding_size, hidden_size, vb.pp("dense"))?,
            out: linear(hidden_size, num_tags, vb.pp("out"))?,
            dropout: Dropout::new(dropout),
        })
    }

    /// Forward pass over a `(batch, maxlen)` index tensor, producing
    /// `(batch, maxlen, num_tags)` logits.
    pub(crate) fn forward_t(&self, ids: &Tensor, train: bool) -> Result<Tensor> {
        let hidden = self.embed.forward(ids)?;
        let hidden = self.dropout.forward(&hidden, train)?;
        let hidden = self.dense.forward(&hidden)?.relu()?;
        Ok(self.out.forward(&hidden)?)
    }
}

/// Build a `(rows, maxlen)` u32 tensor from the selected index rows.
pub(crate) fn rows_tensor(rows: &[Vec<u32>], indices: &[usize], device: &Device) -> Result<Tensor> {
    let maxlen = rows.first().map_or(0, Vec::len);
    let mut flat = Vec::with_capacity(indices.len() * maxlen);
    for &i in indices {
        flat.extend_from_slice(&rows[i]);
    }
    Ok(Tensor::from_vec(flat, (indices.len(), maxlen), device)?)
}

fn scalar_tensor(values: &[u32], indices: &[usize], device: &Device) -> Result<Tensor> {
    let selected: Vec<u32> = indices.iter().map(|&i| values[i]).collect();
    Ok(Tensor::from_vec(selected, indices.len(), device)?)
}

/// Train the classifier with minibatch AdamW and early stopping on
/// validation accuracy. Returns the best validation accuracy seen, or
/// `None` when no validation data was supplied.
pub(crate) fn fit_classifier(
    net: &TextClassifierNet,
    varmap: &VarMap,
    x_train: &[Vec<u32>],
    y_train: &[u32],
    x_val: &[Vec<u32>],
    y_val: &[u32],
    training: &TrainingConfig,
    device: &Device,
) -> Result<Option<f32>> {
    let mut opt = AdamW::new(
        varmap.all_vars(),
        ParamsAdamW { lr: training.learning_rate, ..Default::default() },
    )?;

    let mut best_accuracy: Option<f32> = None;
    let mut epochs_since_best = 0usize;

    for epoch in 1..=training.max_epoch {
        let order = shuffled_indices(x_train.len(), training.seed.wrapping_add(epoch as u64));
        let mut epoch_loss = 0f32;
        let mut batches = 0usize;

        for chunk in order.chunks(training.batch_size) {
            let xb = rows_tensor(x_train, chunk, device)?;
            let yb = scalar_tensor(y_train, chunk, device)?;
            let logits = net.forward_t(&xb, true)?;
            let batch_loss = loss::cross_entropy(&logits, &yb)?;
            opt.backward_step(&batch_loss)?;
            epoch_loss += batch_loss.to_scalar::<f32>()?;
            batches += 1;
        }
        let mean_loss = epoch_loss / batches.max(1) as f32;

        if x_val.is_empty() {
            info!(epoch, loss = mean_loss, "epoch complete");
            continue;
        }

        let predictions = classifier_predictions(net, x_val, device)?;
        let correct = predictions.iter().zip(y_val).filter(|(p, t)| p == t).count();
        let accuracy = correct as f32 / y_val.len() as f32;
        info!(epoch, loss = mean_loss, val_accuracy = accuracy, "epoch complete");

        if best_accuracy.is_none_or(|best| accuracy > best) {
            best_accuracy = Some(accuracy);
            epochs_since_best = 0;
        } else {
            epochs_since_best += 1;
            if epochs_since_best >= training.patience {
                info!(epoch, "early stop, no validation improvement");
                break;
            }
        }
    }
    Ok(best_accuracy)
}

/// Class probabilities for every input row.
pub(crate) fn classifier_probabilities(
    net: &TextClassifierNet,
    rows: &[Vec<u32>],
    device: &Device,
) -> Result<Vec<Vec<f32>>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let indices: Vec<usize> = (0..rows.len()).collect();
    let x = rows_tensor(rows, &indices, device)?;
    let logits = net.forward_t(&x, false)?;
    let probabilities = ops::softmax(&logits, D::Minus1)?;
    Ok(probabilities.to_vec2::<f32>()?)
}

/// Argmax class index for every input row.
pub(crate) fn classifier_predictions(
    net: &TextClassifierNet,
    rows: &[Vec<u32>],
    device: &Device,
) -> Result<Vec<u32>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let indices: Vec<usize> = (0..rows.len()).collect();
    let x = rows_tensor(rows, &indices, device)?;
    let logits = net.forward_t(&x, false)?;
    Ok(logits.argmax(D::Minus1)?.to_vec1::<u32>()?)
}

/// Train the tagger with minibatch AdamW and early stopping on token
/// accuracy over non-padding validation positions.
pub(crate) fn fit_tagger(
    net: &SequenceTaggerNet,
    varmap: &VarMap,
    x_train: &[Vec<u32>],
    y_train: &[Vec<u32>],
    x_val: &[Vec<u32>],
    y_val: &[Vec<u32>],
    training: &TrainingConfig,
    device: &Device,
) -> Result<Option<f32>> {
    let mut opt = AdamW::new(
        varmap.all_vars(),
        ParamsAdamW { lr: training.learning_rate, ..Default::default() },
    )?;

    let mut best_accuracy: Option<f32> = None;
    let mut epochs_since_best = 0usize;

    for epoch in 1..=training.max_epoch {
        let order = shuffled_indices(x_train.len(), training.seed.wrapping_add(epoch as u64));
        let mut epoch_loss = 0f32;
        let mut batches = 0usize;

        for chunk in order.chunks(training.batch_size) {
            let xb = rows_tensor(x_train, chunk, device)?;
            let yb = rows_tensor(y_train, chunk, device)?;
            let logits = net.forward_t(&xb, true)?;
            let (batch, maxlen, num_tags) = logits.dims3()?;
            debug_assert_eq!((batch, maxlen), yb.dims2()?);
            let flat_logits = logits.reshape((batch * maxlen, num_tags))?;
            let flat_targets = yb.reshape(batch * maxlen)?;
            let batch_loss = loss::cross_entropy(&flat_logits, &flat_targets)?;
            opt.backward_step(&batch_loss)?;
            epoch_loss += batch_loss.to_scalar::<f32>()?;
            batches += 1;
        }
        let mean_loss = epoch_loss / batches.max(1) as f32;

        if x_val.is_empty() {
            info!(epoch, loss = mean_loss, "epoch complete");
            continue;
        }

        let predictions = tagger_predictions(net, x_val, device)?;
        let mut correct = 0usize;
        let mut total = 0usize;
        for (predicted, target) in predictions.iter().zip(y_val) {
            for (&p, &t) in predicted.iter().zip(target) {
                // Padding positions carry tag index 0 and are not scored.
                if t != 0 {
                    total += 1;
                    if p == t {
                        correct += 1;
                    }
                }
            }
        }
        let accuracy = if total == 0 { 0.0 } else { correct as f32 / total as f32 };
        info!(epoch, loss = mean_loss, val_accuracy = accuracy, "epoch complete");

        if best_accuracy.is_none_or(|best| accuracy > best) {
            best_accuracy = Some(accuracy);
            epochs_since_best = 0;
        } else {
            epochs_since_best += 1;
            if epochs_since_best >= training.patience {
                info!(epoch, "early stop, no validation improvement");
                break;
            }
        }
    }
    Ok(best_accuracy)
}

/// Per-position tag probabilities for every input row, for ensemble
/// averaging.
pub(crate) fn tagger_probabilities(
    net: &SequenceTaggerNet,
    rows: &[Vec<u32>],
    device: &Device,
) -> Result<Vec<Vec<Vec<f32>>>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let indices: Vec<usize> = (0..rows.len()).collect();
    let x = rows_tensor(rows, &indices, device)?;
    let logits = net.forward_t(&x, false)?;
    let probabilities = ops::softmax(&logits, D::Minus1)?;
    Ok(probabilities.to_vec3::<f32>()?)
}

/// Argmax tag index per position for every input row.
pub(crate) fn tagger_predictions(
    net: &SequenceTaggerNet,
    rows: &[Vec<u32>],
    device: &Device,
) -> Result<Vec<Vec<u32>>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let indices: Vec<usize> = (0..rows.len()).collect();
    let x = rows_tensor(rows, &indices, device)?;
    let logits = net.forward_t(&x, false)?;
    Ok(logits.argmax(D::Minus1)?.to_vec2::<u32>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;

    fn tiny_classifier(vocab: usize, classes: usize) -> (TextClassifierNet, VarMap) {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let net = TextClassifierNet::new(vb, vocab, 8, 4, classes, 0.0).unwrap();
        (net, varmap)
    }

    #[test]
    fn test_classifier_shapes() {
        let device = Device::Cpu;
        let (net, _varmap) = tiny_classifier(10, 3);
        let rows = vec![vec![2u32, 3, 0, 0], vec![4u32, 1, 5, 0]];
        let probabilities = classifier_probabilities(&net, &rows, &device).unwrap();
        assert_eq!(probabilities.len(), 2);
        assert_eq!(probabilities[0].len(), 3);
        for row in &probabilities {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_classifier_learns_a_separable_toy_problem() {
        let device = Device::Cpu;
        let (net, varmap) = tiny_classifier(6, 2);
        // Class 0 sentences use words {2, 3}, class 1 sentences {4, 5}.
        let x: Vec<Vec<u32>> = vec![
            vec![2, 3, 2, 0],
            vec![3, 2, 3, 0],
            vec![2, 2, 3, 3],
            vec![4, 5, 4, 0],
            vec![5, 4, 5, 0],
            vec![4, 4, 5, 5],
        ];
        let y: Vec<u32> = vec![0, 0, 0, 1, 1, 1];
        let training = TrainingConfig {
            batch_size: 2,
            max_epoch: 80,
            learning_rate: 5e-2,
            patience: 80,
            ..Default::default()
        };
        fit_classifier(&net, &varmap, &x, &y, &[], &[], &training, &device).unwrap();

        let predictions = classifier_predictions(&net, &x, &device).unwrap();
        assert_eq!(predictions, y);
    }

    #[test]
    fn test_tagger_shapes() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let net = SequenceTaggerNet::new(vb, 10, 8, 4, 5, 0.0).unwrap();
        let rows = vec![vec![2u32, 3, 0, 0]];
        let predictions = tagger_predictions(&net, &rows, &device).unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].len(), 4);
        assert!(predictions[0].iter().all(|&t| t < 5));
    }

    #[test]
    fn test_seeded_embeddings_are_used() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let matrix = vec![0.0; 4 * 2];
        seed_embeddings(&varmap, matrix, 4, 2, &device).unwrap();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let net = TextClassifierNet::new(vb, 4, 2, 3, 2, 0.0).unwrap();
        // With an all-zero embedding table every input pools to the same
        // hidden state, so the two rows score identically.
        let probabilities =
            classifier_probabilities(&net, &[vec![1, 2], vec![3, 0]], &device).unwrap();
        assert_eq!(probabilities[0], probabilities[1]);
    }
}
