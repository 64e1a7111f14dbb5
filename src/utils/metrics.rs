//! Metrics Module for Model Evaluation
//!
//! Provides classification metrics for evaluating PCB defect models:
//! - Accuracy, precision, recall, F1 (macro-averaged and per class)
//! - Confusion matrix
//! - Log loss (overall and per class)
//!
//! Every report is keyed by the original class-name vocabulary rather than
//! raw encoding indices, so results stay interpretable regardless of the
//! internal label encoding order.

use serde::{Deserialize, Serialize};

use crate::dataset::config::ClassCatalog;

/// Comprehensive metrics for model evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    /// Total number of samples evaluated
    pub total_samples: usize,

    /// Number of correct predictions
    pub correct_predictions: usize,

    /// Overall accuracy (correct / total)
    pub accuracy: f64,

    /// Average log loss over all samples
    pub log_loss: f64,

    /// Macro-averaged precision (average of per-class precisions)
    pub macro_precision: f64,

    /// Macro-averaged recall
    pub macro_recall: f64,

    /// Macro-averaged F1-score
    pub macro_f1: f64,

    /// Per-class metrics, in declared class order
    pub per_class: Vec<ClassMetrics>,

    /// Confusion matrix
    pub confusion_matrix: ConfusionMatrix,
}

impl Metrics {
    /// Create metrics from predicted/actual class indices and the predicted
    /// probability vectors, keyed by the declared class names.
    ///
    /// `probabilities[i]` is the full score vector for sample `i`; the
    /// probability assigned to the true class drives the log-loss terms.
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        probabilities: &[Vec<f32>],
        class_names: &[String],
    ) -> Self {
        assert_eq!(
            predictions.len(),
            ground_truth.len(),
            "predictions and ground truth must have the same length"
        );

        let num_classes = class_names.len();
        let total_samples = predictions.len();
        if total_samples == 0 {
            return Self::empty(class_names);
        }

        let confusion_matrix =
            ConfusionMatrix::from_predictions(predictions, ground_truth, num_classes);

        let correct_predictions = predictions
            .iter()
            .zip(ground_truth.iter())
            .filter(|(p, g)| p == g)
            .count();
        let accuracy = correct_predictions as f64 / total_samples as f64;

        // Per-sample negative log likelihood of the true class, clamped away
        // from ln(0).
        let mut class_loss_sums = vec![0.0f64; num_classes];
        let mut loss_sum = 0.0f64;
        for (probs, &actual) in probabilities.iter().zip(ground_truth.iter()) {
            let p = probs
                .get(actual)
                .copied()
                .unwrap_or(0.0)
                .max(1e-12) as f64;
            let nll = -p.ln();
            loss_sum += nll;
            if actual < num_classes {
                class_loss_sums[actual] += nll;
            }
        }
        let log_loss = loss_sum / total_samples as f64;

        let per_class: Vec<ClassMetrics> = (0..num_classes)
            .map(|class_idx| {
                let mut m = ClassMetrics::from_confusion_matrix(&confusion_matrix, class_idx);
                m.class_name = class_names[class_idx].clone();
                m.log_loss = if m.support > 0 {
                    class_loss_sums[class_idx] / m.support as f64
                } else {
                    0.0
                };
                m
            })
            .collect();

        // Macro averages over classes that actually appear in the set
        let represented: Vec<&ClassMetrics> =
            per_class.iter().filter(|m| m.support > 0).collect();
        let n = represented.len() as f64;
        let (macro_precision, macro_recall, macro_f1) = if n > 0.0 {
            (
                represented.iter().map(|m| m.precision).sum::<f64>() / n,
                represented.iter().map(|m| m.recall).sum::<f64>() / n,
                represented.iter().map(|m| m.f1).sum::<f64>() / n,
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        Self {
            total_samples,
            correct_predictions,
            accuracy,
            log_loss,
            macro_precision,
            macro_recall,
            macro_f1,
            per_class,
            confusion_matrix,
        }
    }

    fn empty(class_names: &[String]) -> Self {
        Self {
            total_samples: 0,
            correct_predictions: 0,
            accuracy: 0.0,
            log_loss: 0.0,
            macro_precision: 0.0,
            macro_recall: 0.0,
            macro_f1: 0.0,
            per_class: class_names
                .iter()
                .map(|name| ClassMetrics {
                    class_name: name.clone(),
                    ..ClassMetrics::default()
                })
                .collect(),
            confusion_matrix: ConfusionMatrix::new(class_names.len()),
        }
    }
}

/// Per-class metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Class name from the declared vocabulary
    pub class_name: String,

    /// True positives
    pub true_positives: usize,

    /// False positives
    pub false_positives: usize,

    /// False negatives
    pub false_negatives: usize,

    /// Precision = TP / (TP + FP)
    pub precision: f64,

    /// Recall = TP / (TP + FN)
    pub recall: f64,

    /// F1 = 2 * (precision * recall) / (precision + recall)
    pub f1: f64,

    /// Support = number of actual samples of this class
    pub support: usize,

    /// Average log loss over samples of this class
    pub log_loss: f64,
}

impl ClassMetrics {
    /// Calculate metrics for a class from a confusion matrix
    pub fn from_confusion_matrix(cm: &ConfusionMatrix, class_idx: usize) -> Self {
        let true_positives = cm.get(class_idx, class_idx);

        let false_positives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(i, class_idx))
            .sum();

        let false_negatives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(class_idx, i))
            .sum();

        let support = true_positives + false_negatives;

        let precision = if true_positives + false_positives > 0 {
            true_positives as f64 / (true_positives + false_positives) as f64
        } else {
            0.0
        };

        let recall = if support > 0 {
            true_positives as f64 / support as f64
        } else {
            0.0
        };

        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            class_name: String::new(),
            true_positives,
            false_positives,
            false_negatives,
            precision,
            recall,
            f1,
            support,
            log_loss: 0.0,
        }
    }
}

/// Confusion Matrix for multi-class classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Number of classes
    pub num_classes: usize,

    /// Matrix data (row = actual, column = predicted), row-major
    pub matrix: Vec<usize>,
}

impl ConfusionMatrix {
    /// Create a new empty confusion matrix
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            matrix: vec![0; num_classes * num_classes],
        }
    }

    /// Create confusion matrix from predictions and ground truth
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        let mut cm = Self::new(num_classes);
        for (&pred, &actual) in predictions.iter().zip(ground_truth.iter()) {
            cm.add(actual, pred);
        }
        cm
    }

    /// Add a single prediction to the matrix
    pub fn add(&mut self, actual: usize, predicted: usize) {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted] += 1;
        }
    }

    /// Get the count at (actual, predicted)
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted]
        } else {
            0
        }
    }

    /// Total sample count
    pub fn total(&self) -> usize {
        self.matrix.iter().sum()
    }

    /// Number of correct predictions (diagonal sum)
    pub fn correct(&self) -> usize {
        (0..self.num_classes).map(|i| self.get(i, i)).sum()
    }

    /// Render the matrix with class names as row/column headers.
    pub fn display(&self, class_names: &[String]) -> String {
        let mut output = String::new();
        output.push_str("Confusion matrix (rows = actual, cols = predicted):\n");

        let short = |name: &str| -> String { name.chars().take(8).collect() };

        output.push_str(&format!("{:>10}", ""));
        for col in 0..self.num_classes {
            let name = class_names.get(col).map(|s| s.as_str()).unwrap_or("?");
            output.push_str(&format!("{:>9}", short(name)));
        }
        output.push('\n');

        for row in 0..self.num_classes {
            let name = class_names.get(row).map(|s| s.as_str()).unwrap_or("?");
            output.push_str(&format!("{:>10}", short(name)));
            for col in 0..self.num_classes {
                let count = self.get(row, col);
                if row == col {
                    output.push_str(&format!("  [{:>5}]", count));
                } else {
                    output.push_str(&format!("   {:>5} ", count));
                }
            }
            output.push('\n');
        }

        output
    }
}

/// Evaluation report: shaped metrics ready for presentation.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub metrics: Metrics,
}

impl EvaluationReport {
    pub fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }

    /// Render the report, resolving class descriptions through the catalog.
    pub fn render(&self, catalog: &ClassCatalog) -> String {
        let m = &self.metrics;
        let mut out = String::new();

        out.push_str("=== Model Evaluation Metrics ===\n");
        out.push_str(&format!("Accuracy:        {:.4}\n", m.accuracy));
        out.push_str(&format!("Log loss:        {:.4}\n", m.log_loss));
        out.push_str(&format!("Macro precision: {:.4}\n", m.macro_precision));
        out.push_str(&format!("Macro recall:    {:.4}\n", m.macro_recall));
        out.push_str(&format!("Macro F1:        {:.4}\n", m.macro_f1));
        out.push_str(&format!("Samples:         {}\n", m.total_samples));

        out.push_str("\n=== Per-Class Metrics ===\n");
        for class in &m.per_class {
            out.push_str(&format!(
                "{}: log loss = {:.4}, precision = {:.4}, recall = {:.4}, support = {}\n",
                catalog.describe(&class.class_name),
                class.log_loss,
                class.precision,
                class.recall,
                class.support,
            ));
        }

        let class_names: Vec<String> =
            m.per_class.iter().map(|c| c.class_name.clone()).collect();
        out.push('\n');
        out.push_str(&m.confusion_matrix.display(&class_names));

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_confusion_matrix() {
        let predictions = vec![0, 1, 2, 0, 1, 2, 0, 0, 2, 2];
        let ground_truth = vec![0, 1, 2, 0, 2, 2, 1, 0, 1, 2];

        let cm = ConfusionMatrix::from_predictions(&predictions, &ground_truth, 3);

        assert_eq!(cm.get(0, 0), 3);
        assert_eq!(cm.get(1, 1), 1);
        assert_eq!(cm.get(2, 2), 3);
        assert_eq!(cm.total(), 10);
        assert_eq!(cm.correct(), 7);
    }

    #[test]
    fn test_metrics_keyed_by_class_name() {
        let predictions = vec![0, 0, 1, 1];
        let ground_truth = vec![0, 1, 1, 1];
        let probs = vec![
            vec![0.9, 0.1],
            vec![0.8, 0.2],
            vec![0.3, 0.7],
            vec![0.4, 0.6],
        ];

        let metrics = Metrics::from_predictions(
            &predictions,
            &ground_truth,
            &probs,
            &names(&["Dry_joint", "redundant"]),
        );

        assert_eq!(metrics.total_samples, 4);
        assert_eq!(metrics.correct_predictions, 3);
        assert!((metrics.accuracy - 0.75).abs() < 1e-9);
        assert_eq!(metrics.per_class[0].class_name, "Dry_joint");
        assert_eq!(metrics.per_class[1].class_name, "redundant");
        assert_eq!(metrics.per_class[1].support, 3);
    }

    #[test]
    fn test_log_loss_uses_true_class_probability() {
        // One sample, true class 0 predicted with probability 0.5
        let metrics = Metrics::from_predictions(
            &[0],
            &[0],
            &[vec![0.5, 0.5]],
            &names(&["A", "B"]),
        );

        assert!((metrics.log_loss - 0.5f64.ln().abs()).abs() < 1e-9);
        assert!((metrics.per_class[0].log_loss - metrics.log_loss).abs() < 1e-9);
    }

    #[test]
    fn test_class_metrics_from_confusion_matrix() {
        let predictions = vec![0, 0, 0, 1, 1];
        let ground_truth = vec![0, 0, 1, 1, 0];

        let cm = ConfusionMatrix::from_predictions(&predictions, &ground_truth, 2);
        let class0 = ClassMetrics::from_confusion_matrix(&cm, 0);

        assert_eq!(class0.true_positives, 2);
        assert_eq!(class0.false_positives, 1);
        assert_eq!(class0.false_negatives, 1);
        assert!((class0.precision - 2.0 / 3.0).abs() < 1e-9);
        assert!((class0.recall - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = Metrics::from_predictions(&[], &[], &[], &names(&["A", "B"]));
        assert_eq!(metrics.total_samples, 0);
        assert_eq!(metrics.accuracy, 0.0);
        assert_eq!(metrics.per_class.len(), 2);
    }
}
