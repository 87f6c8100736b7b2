//! # Evaluation
//!
//! Classification reports for the sentiment classifier and span-level
//! precision/recall/F1 for the sequence tagger.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use scriba_core::tags::entity_spans;

/// Per-class scores of a classification run.
#[derive(Debug, Clone, Serialize)]
pub struct ClassScores {
    pub class: String,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    /// Number of gold instances of this class.
    pub support: usize,
}

/// Evaluation summary for the classifier.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub accuracy: f32,
    pub classes: Vec<ClassScores>,
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<12} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1", "support")?;
        for scores in &self.classes {
            writeln!(
                f,
                "{:<12} {:>9.4} {:>9.4} {:>9.4} {:>9}",
                scores.class, scores.precision, scores.recall, scores.f1, scores.support
            )?;
        }
        write!(f, "accuracy: {:.4}", self.accuracy)
    }
}

fn prf(true_positive: usize, predicted: usize, gold: usize) -> (f32, f32, f32) {
    let precision = if predicted == 0 { 0.0 } else { true_positive as f32 / predicted as f32 };
    let recall = if gold == 0 { 0.0 } else { true_positive as f32 / gold as f32 };
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    (precision, recall, f1)
}

/// Build a per-class report from aligned gold and predicted class indices.
pub fn classification_report(
    y_true: &[usize],
    y_pred: &[usize],
    classes: &[String],
) -> ClassificationReport {
    assert_eq!(y_true.len(), y_pred.len());

    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    let accuracy = if y_true.is_empty() { 0.0 } else { correct as f32 / y_true.len() as f32 };

    let mut per_class = Vec::with_capacity(classes.len());
    for (index, class) in classes.iter().enumerate() {
        let gold = y_true.iter().filter(|&&t| t == index).count();
        let predicted = y_pred.iter().filter(|&&p| p == index).count();
        let true_positive = y_true
            .iter()
            .zip(y_pred)
            .filter(|&(&t, &p)| t == index && p == index)
            .count();
        let (precision, recall, f1) = prf(true_positive, predicted, gold);
        per_class.push(ClassScores {
            class: class.clone(),
            precision,
            recall,
            f1,
            support: gold,
        });
    }

    ClassificationReport { accuracy, classes: per_class }
}

/// Evaluation summary for the sequence tagger: exact-span scores plus
/// token-level accuracy.
#[derive(Debug, Clone, Serialize)]
pub struct SequenceReport {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub token_accuracy: f32,
    /// Number of predicted entity spans.
    pub predicted: usize,
    /// Number of gold entity spans.
    pub expected: usize,
    /// Number of exactly matching spans.
    pub correct: usize,
}

impl fmt::Display for SequenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "f1: {:.4}  precision: {:.4}  recall: {:.4}  token accuracy: {:.4}  \
             ({} predicted / {} expected / {} correct)",
            self.f1, self.precision, self.recall, self.token_accuracy,
            self.predicted, self.expected, self.correct
        )
    }
}

/// Score predicted label sequences against gold ones. A span counts as
/// correct only on an exact boundary and type match.
pub fn sequence_report(y_true: &[Vec<String>], y_pred: &[Vec<String>]) -> SequenceReport {
    assert_eq!(y_true.len(), y_pred.len());

    let mut correct = 0usize;
    let mut predicted = 0usize;
    let mut expected = 0usize;
    let mut token_correct = 0usize;
    let mut token_total = 0usize;

    for (gold, pred) in y_true.iter().zip(y_pred) {
        let gold_spans: HashSet<_> = entity_spans(gold).into_iter().collect();
        let pred_spans: HashSet<_> = entity_spans(pred).into_iter().collect();
        correct += gold_spans.intersection(&pred_spans).count();
        predicted += pred_spans.len();
        expected += gold_spans.len();

        for (g, p) in gold.iter().zip(pred) {
            token_total += 1;
            if g == p {
                token_correct += 1;
            }
        }
    }

    let (precision, recall, f1) = prf(correct, predicted, expected);
    let token_accuracy = if token_total == 0 {
        0.0
    } else {
        token_correct as f32 / token_total as f32
    };

    SequenceReport { precision, recall, f1, token_accuracy, predicted, expected, correct }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_classification_report_perfect() {
        let classes = vec!["negative".to_string(), "positive".to_string()];
        let report = classification_report(&[0, 1, 1], &[0, 1, 1], &classes);
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.classes[1].f1, 1.0);
        assert_eq!(report.classes[0].support, 1);
    }

    #[test]
    fn test_classification_report_mixed() {
        let classes = vec!["a".to_string(), "b".to_string()];
        // gold: a a b b, predicted: a b b b
        let report = classification_report(&[0, 0, 1, 1], &[0, 1, 1, 1], &classes);
        assert_eq!(report.accuracy, 0.75);
        assert_eq!(report.classes[0].recall, 0.5);
        assert_eq!(report.classes[0].precision, 1.0);
        assert!((report.classes[1].precision - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_sequence_report_exact_spans() {
        let gold = vec![labels(&["B-PER", "I-PER", "O", "B-LOC"])];
        let pred = vec![labels(&["B-PER", "I-PER", "O", "O"])];
        let report = sequence_report(&gold, &pred);
        assert_eq!(report.expected, 2);
        assert_eq!(report.predicted, 1);
        assert_eq!(report.correct, 1);
        assert_eq!(report.precision, 1.0);
        assert_eq!(report.recall, 0.5);
        assert_eq!(report.token_accuracy, 0.75);
    }

    #[test]
    fn test_sequence_report_boundary_mismatch_is_wrong() {
        let gold = vec![labels(&["B-PER", "I-PER", "O"])];
        let pred = vec![labels(&["B-PER", "O", "O"])];
        let report = sequence_report(&gold, &pred);
        assert_eq!(report.correct, 0);
        assert_eq!(report.f1, 0.0);
    }
}
