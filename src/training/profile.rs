//! Training Profiles
//!
//! A training profile bundles the architecture tier with the hyperparameters
//! used to fit it. Profiles are immutable once selected; the backend
//! initializer walks an ordered ladder of them and commits to the first one
//! that can be constructed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Architecture tiers, from most to least capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Architecture {
    /// Full-size model, 128px input
    Standard,
    /// Reduced model for constrained hosts, 96px input
    Compat,
    /// Smallest model, 64px input
    Minimal,
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::Standard => write!(f, "Standard"),
            Architecture::Compat => write!(f, "Compat"),
            Architecture::Minimal => write!(f, "Minimal"),
        }
    }
}

/// One candidate configuration for the training backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingProfile {
    /// Profile name, used in logs and failure diagnostics
    pub name: String,

    /// Architecture tier to build
    pub architecture: Architecture,

    /// Maximum number of training epochs
    pub epochs: usize,

    /// Batch size
    pub batch_size: usize,

    /// Adam learning rate
    pub learning_rate: f64,

    /// Early stopping: epochs without improvement before stopping
    pub patience: usize,

    /// Early stopping: minimum validation-accuracy improvement that counts
    pub min_delta: f64,
}

impl TrainingProfile {
    /// Preferred profile: full architecture, full training schedule.
    pub fn standard() -> Self {
        Self {
            name: "standard".to_string(),
            architecture: Architecture::Standard,
            epochs: 10,
            batch_size: 32,
            learning_rate: 1e-3,
            patience: 3,
            min_delta: 1e-3,
        }
    }

    /// Degraded profile: smaller model and batch, single epoch.
    pub fn compatibility() -> Self {
        Self {
            name: "compatibility".to_string(),
            architecture: Architecture::Compat,
            epochs: 1,
            batch_size: 8,
            learning_rate: 1e-3,
            patience: 1,
            min_delta: 1e-3,
        }
    }

    /// Last-resort profile: minimal model, conservative learning rate.
    pub fn simplified() -> Self {
        Self {
            name: "simplified".to_string(),
            architecture: Architecture::Minimal,
            epochs: 1,
            batch_size: 4,
            learning_rate: 1e-4,
            patience: 1,
            min_delta: 1e-3,
        }
    }

    /// Label used in initialization diagnostics.
    pub fn describe(&self) -> String {
        format!("{} ({})", self.name, self.architecture)
    }
}

/// Host capability classification, detected once at startup and held fixed
/// for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareProfile {
    /// Ordinary desktop/server host
    Full,
    /// Memory- or compute-constrained host (ARM boards and the like)
    Constrained,
}

impl HardwareProfile {
    /// Classify the current host.
    pub fn detect() -> Self {
        if cfg!(any(target_arch = "aarch64", target_arch = "arm")) {
            HardwareProfile::Constrained
        } else {
            HardwareProfile::Full
        }
    }

    /// The ordered fallback ladder for this host class.
    ///
    /// Constrained hosts skip the standard tier entirely rather than
    /// discovering mid-run that it does not fit.
    pub fn ladder(&self) -> Vec<TrainingProfile> {
        match self {
            HardwareProfile::Full => vec![
                TrainingProfile::standard(),
                TrainingProfile::compatibility(),
                TrainingProfile::simplified(),
            ],
            HardwareProfile::Constrained => vec![
                TrainingProfile::compatibility(),
                TrainingProfile::simplified(),
            ],
        }
    }
}
