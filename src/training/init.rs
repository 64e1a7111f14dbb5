//! Backend Initializer
//!
//! Walks the ordered fallback ladder of training profiles and commits to the
//! first candidate whose classifier can actually be constructed. Probing is
//! an explicit decision table over `Result` values; there is no control flow
//! through panics. When every candidate fails, the caller gets one
//! consolidated error with per-candidate diagnostics.

use tracing::{info, warn};

use crate::model::cnn::ClassifierConfig;
use crate::training::profile::{HardwareProfile, TrainingProfile};
use crate::utils::error::{BackendProbeReport, InitAttempt, PcbClassifyError, Result};

/// Selects a training profile from an ordered candidate ladder.
#[derive(Debug, Clone)]
pub struct BackendInitializer {
    candidates: Vec<TrainingProfile>,
}

impl BackendInitializer {
    /// Ladder derived from the detected hardware profile.
    pub fn new(hardware: HardwareProfile) -> Self {
        Self {
            candidates: hardware.ladder(),
        }
    }

    /// Explicit candidate list, in priority order.
    pub fn with_candidates(candidates: Vec<TrainingProfile>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[TrainingProfile] {
        &self.candidates
    }

    /// Select the first profile accepted by `probe`.
    ///
    /// Candidates after the first success are never probed. If all fail,
    /// returns `BackendUnavailable` carrying one [`InitAttempt`] per
    /// candidate, in ladder order.
    pub fn initialize_with<F>(&self, mut probe: F) -> Result<TrainingProfile>
    where
        F: FnMut(&TrainingProfile) -> std::result::Result<(), String>,
    {
        let mut attempts = Vec::new();

        for profile in &self.candidates {
            info!(profile = %profile.describe(), "Probing training profile");
            match probe(profile) {
                Ok(()) => {
                    info!(profile = %profile.describe(), "Training profile selected");
                    return Ok(profile.clone());
                }
                Err(reason) => {
                    warn!(
                        profile = %profile.describe(),
                        reason = %reason,
                        "Training profile rejected, trying next candidate"
                    );
                    attempts.push(InitAttempt {
                        profile: profile.describe(),
                        reason,
                    });
                }
            }
        }

        Err(PcbClassifyError::BackendUnavailable(BackendProbeReport {
            attempts,
        }))
    }

    /// Select a profile using the standard probe: the classifier
    /// configuration for the profile's architecture must validate.
    pub fn initialize(&self, num_classes: usize) -> Result<TrainingProfile> {
        self.initialize_with(|profile| {
            if profile.batch_size == 0 {
                return Err("batch size must be greater than zero".to_string());
            }
            if profile.epochs == 0 {
                return Err("epoch count must be greater than zero".to_string());
            }
            ClassifierConfig::for_architecture(profile.architecture, num_classes).validate()
        })
    }
}
