//! Inference layer: single-image prediction.

pub mod predictor;

pub use predictor::{predict_one, round_confidence, PredictionResult, UNKNOWN_LABEL};
