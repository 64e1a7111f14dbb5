//! Error Handling Module
//!
//! Defines custom error types for the PCB classification library.
//! Uses thiserror for ergonomic error definitions.
//!
//! Two failure classes from the dataset layer are deliberately absent here
//! because they are recovered locally and never surface as errors: a missing
//! split directory (logged warning, empty sample set) and a malformed
//! annotation line (silently skipped).

use thiserror::Error;

/// One entry in the backend initialization fallback ladder diagnostics.
#[derive(Debug, Clone)]
pub struct InitAttempt {
    /// Human-readable profile identifier (e.g. "standard (Standard)")
    pub profile: String,
    /// Why construction of a trainer for this profile failed
    pub reason: String,
}

/// Consolidated diagnostics for a failed initialization ladder.
///
/// Carries one [`InitAttempt`] per candidate that was tried, in ladder order.
#[derive(Debug, Clone)]
pub struct BackendProbeReport {
    pub attempts: Vec<InitAttempt>,
}

impl std::fmt::Display for BackendProbeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "all {} candidate profiles failed:", self.attempts.len())?;
        for attempt in &self.attempts {
            writeln!(f, "  - {}: {}", attempt.profile, attempt.reason)?;
        }
        write!(
            f,
            "hint: verify the class count in data.yaml and retry with a smaller \
             batch size or the minimal architecture"
        )
    }
}

/// Main error type for PCB classification operations
#[derive(Error, Debug)]
pub enum PcbClassifyError {
    /// Config file missing, unparseable, or internally inconsistent; fatal
    #[error("Configuration error: {0}")]
    ConfigInvalid(String),

    /// Every initialization candidate failed; fatal, no training attempted
    #[error("Training backend unavailable: {0}")]
    BackendUnavailable(BackendProbeReport),

    /// The backend fit call failed after initialization succeeded; not retried
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// Evaluation error, localized to the evaluate operation
    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),

    /// Model persistence error; the in-memory model stays usable
    #[error("Failed to save model: {0}")]
    SaveFailed(String),

    /// Model artifact could not be read back on a later run
    #[error("Model artifact error: {0}")]
    Artifact(String),

    /// Single-image prediction error, localized to that prediction
    #[error("Prediction failed: {0}")]
    PredictionFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for PCB classification operations
pub type Result<T> = std::result::Result<T, PcbClassifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PcbClassifyError::TrainingFailed("loss diverged".to_string());
        assert_eq!(format!("{}", err), "Training failed: loss diverged");
    }

    #[test]
    fn test_probe_report_lists_every_attempt() {
        let report = BackendProbeReport {
            attempts: vec![
                InitAttempt {
                    profile: "standard".to_string(),
                    reason: "out of memory".to_string(),
                },
                InitAttempt {
                    profile: "compatibility".to_string(),
                    reason: "invalid batch size".to_string(),
                },
            ],
        };

        let rendered = format!("{}", report);
        assert!(rendered.contains("standard: out of memory"));
        assert!(rendered.contains("compatibility: invalid batch size"));
        assert!(rendered.contains("all 2 candidate profiles failed"));
    }
}
