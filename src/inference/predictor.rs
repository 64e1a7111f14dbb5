//! Single-Image Prediction
//!
//! Runs one image through a fitted classifier and shapes the outcome as a
//! plain value: the input path, the decoded class name, the confidence of
//! the winning class, and the full score vector.

use std::path::{Path, PathBuf};

use burn::tensor::backend::Backend;
use tracing::debug;

use crate::dataset::burn_dataset::{load_image_chw, DefectBatcher};
use crate::dataset::config::ClassCatalog;
use crate::training::pipeline::{argmax, FittedModel};
use crate::utils::error::{PcbClassifyError, Result};

/// Sentinel label when no class name can be produced.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Outcome of a single-image prediction.
#[derive(Debug, Clone)]
pub struct PredictionResult {
    /// The image that was classified
    pub image_path: PathBuf,

    /// Winning class name, or `"Unknown"`
    pub label: String,

    /// Confidence of the winning class in percent, rounded to two decimals
    pub confidence: f64,

    /// Full softmax score vector in declared class order
    pub scores: Vec<f32>,
}

impl PredictionResult {
    /// One-line human rendering, resolving the class description through
    /// the catalog.
    pub fn formatted(&self, catalog: &ClassCatalog) -> String {
        format!(
            "{}: {} ({:.2}% confidence)",
            self.image_path.display(),
            catalog.describe(&self.label),
            self.confidence
        )
    }
}

/// Classify a single image file.
///
/// The image goes through the same preprocessing as training samples
/// (resize to the model's input size, ImageNet normalization). Confidence
/// is `100 x max(score)` rounded to two decimals.
pub fn predict_one<B: Backend>(
    model: &FittedModel<B>,
    image_path: &Path,
    device: &B::Device,
) -> Result<PredictionResult> {
    let pixels = load_image_chw(image_path, model.input_size).map_err(|e| {
        PcbClassifyError::PredictionFailed(format!("{}: {}", image_path.display(), e))
    })?;

    let batcher = DefectBatcher::<B>::new(device.clone(), model.input_size);
    let batch = batcher.batch(&[(pixels, 0)]);

    let probs = model.classifier.forward_softmax(batch.images);
    let scores: Vec<f32> = probs
        .into_data()
        .to_vec()
        .map_err(|e| PcbClassifyError::PredictionFailed(format!("{:?}", e)))?;

    let winner = argmax(&scores);
    let max_score = scores.get(winner).copied().unwrap_or(0.0);
    let label = model
        .codec
        .decode(winner)
        .unwrap_or(UNKNOWN_LABEL)
        .to_string();
    let confidence = round_confidence(max_score);

    debug!(
        label = %label,
        confidence = confidence,
        "Classified {}",
        image_path.display()
    );

    Ok(PredictionResult {
        image_path: image_path.to_path_buf(),
        label,
        confidence,
        scores,
    })
}

/// Convert a [0, 1] score to a percentage with two-decimal precision.
pub fn round_confidence(score: f32) -> f64 {
    (score as f64 * 10000.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_confidence_two_decimals() {
        assert_eq!(round_confidence(0.98765), 98.77);
        assert_eq!(round_confidence(1.0), 100.0);
        assert_eq!(round_confidence(0.0), 0.0);
        assert_eq!(round_confidence(0.333333), 33.33);
    }

    #[test]
    fn test_confidence_in_percent_range() {
        for score in [0.0f32, 0.25, 0.5, 0.999, 1.0] {
            let c = round_confidence(score);
            assert!((0.0..=100.0).contains(&c));
        }
    }

    #[test]
    fn test_formatted_uses_catalog_description() {
        let catalog = ClassCatalog::new(&[("low_solder", "Insufficient solder")]);
        let result = PredictionResult {
            image_path: PathBuf::from("board.jpg"),
            label: "low_solder".to_string(),
            confidence: 91.5,
            scores: vec![0.915, 0.085],
        };

        let line = result.formatted(&catalog);
        assert!(line.contains("Insufficient solder"));
        assert!(line.contains("91.50%"));
    }

    #[test]
    fn test_formatted_unknown_label_passes_through() {
        let catalog = ClassCatalog::pcb_defects();
        let result = PredictionResult {
            image_path: PathBuf::from("board.jpg"),
            label: UNKNOWN_LABEL.to_string(),
            confidence: 0.0,
            scores: Vec::new(),
        };

        assert!(result.formatted(&catalog).contains("Unknown"));
    }
}
