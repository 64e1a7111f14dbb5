//! Utility modules for error handling, logging, and evaluation metrics.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{BackendProbeReport, InitAttempt, PcbClassifyError, Result};
pub use logging::{init_logging, LogConfig};
pub use metrics::{ClassMetrics, ConfusionMatrix, EvaluationReport, Metrics};
