//! Dataset Configuration
//!
//! Parses the YOLO `data.yaml` manifest into an immutable [`DatasetConfig`]
//! and provides the [`ClassCatalog`] of human-readable defect descriptions.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::utils::error::{PcbClassifyError, Result};

/// Dataset manifest parsed from `data.yaml`.
///
/// Loaded once at startup and read-only afterwards. The `names` list is the
/// authoritative label vocabulary for the whole run; every label encoder is
/// built from it, never from the samples that happen to be scanned first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Relative path to the training image directory
    pub train: String,

    /// Relative path to the validation image directory
    pub val: String,

    /// Relative path to the test image directory
    #[serde(default)]
    pub test: String,

    /// Number of classes
    pub nc: usize,

    /// Ordered class names; index i is the class id used in label files
    pub names: Vec<String>,
}

impl DatasetConfig {
    /// Load and validate a manifest from a `data.yaml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            PcbClassifyError::ConfigInvalid(format!(
                "cannot read {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&raw).map_err(|e| {
            PcbClassifyError::ConfigInvalid(format!(
                "cannot parse {}: {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;
        info!(
            classes = config.nc,
            "Loaded dataset config from {}",
            path.display()
        );
        Ok(config)
    }

    /// Check internal consistency of the manifest.
    pub fn validate(&self) -> Result<()> {
        if self.nc == 0 {
            return Err(PcbClassifyError::ConfigInvalid(
                "class count (nc) must be greater than zero".to_string(),
            ));
        }
        if self.names.len() != self.nc {
            return Err(PcbClassifyError::ConfigInvalid(format!(
                "names lists {} classes but nc = {}",
                self.names.len(),
                self.nc
            )));
        }
        if self.train.is_empty() || self.val.is_empty() {
            return Err(PcbClassifyError::ConfigInvalid(
                "train and val paths must be set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Immutable mapping from class names to human-readable descriptions.
///
/// Constructed once at startup and passed explicitly to whoever renders
/// output (reporter, predictor). Names absent from the catalog fall back to
/// themselves, so an incomplete catalog degrades gracefully.
#[derive(Debug, Clone)]
pub struct ClassCatalog {
    descriptions: HashMap<String, String>,
}

impl ClassCatalog {
    /// Build a catalog from explicit (name, description) pairs.
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            descriptions: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// The standard PCB defect classes and their descriptions.
    pub fn pcb_defects() -> Self {
        Self::new(&[
            ("Dry_joint", "Dry joint (cold solder joint)"),
            ("Incorrect_installation", "Incorrectly installed component"),
            ("Short_circuit", "Short circuit between traces"),
            ("low_solder", "Insufficient solder"),
            ("oppostie_direction", "Component mounted in reverse orientation"),
            ("redundant", "Redundant (extra) component"),
        ])
    }

    /// Human description for a class name, or the name itself if unknown.
    pub fn describe<'a>(&'a self, class_name: &'a str) -> &'a str {
        self.descriptions
            .get(class_name)
            .map(|s| s.as_str())
            .unwrap_or(class_name)
    }
}
