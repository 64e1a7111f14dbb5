//! # PCB Defect Classification
//!
//! A Rust library for classifying printed-circuit-board defects from
//! YOLO-format datasets using the Burn framework.
//!
//! ## Features
//!
//! - **YOLO dataset ingestion**: walks `images/` + `labels/` split trees and
//!   turns per-object annotations into flat classification samples
//! - **Fallback training profiles**: an ordered ladder of architectures so
//!   training degrades gracefully on constrained hosts instead of failing
//! - **Burn framework** for portable neural network training and inference
//! - **Class-name keyed reporting**: metrics and predictions are always
//!   expressed in the dataset's declared vocabulary
//!
//! ## Modules
//!
//! - `dataset`: manifest parsing, split scanning, label encoding, batching
//! - `model`: CNN architecture built with Burn
//! - `training`: profiles, the fallback initializer, pipeline, orchestrator
//! - `inference`: single-image prediction
//! - `utils`: logging, errors, and evaluation metrics
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pcb_classify::backend::TrainingBackend;
//! use pcb_classify::dataset::DatasetConfig;
//! use pcb_classify::training::{BackendInitializer, HardwareProfile, Orchestrator, RuntimeOptions};
//!
//! let config = DatasetConfig::load("PCB_detect_6_700_yolo/data.yaml".as_ref())?;
//! let initializer = BackendInitializer::new(HardwareProfile::detect());
//! let orchestrator =
//!     Orchestrator::<TrainingBackend>::new(config, RuntimeOptions::default(), initializer);
//! let outcome = orchestrator.train()?;
//! ```

pub mod backend;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::burn_dataset::{DefectBatch, DefectBatcher, EncodedDataset, LabelCodec};
pub use dataset::config::{ClassCatalog, DatasetConfig};
pub use dataset::scanner::{Sample, SampleSet};
pub use inference::predictor::{PredictionResult, UNKNOWN_LABEL};
pub use model::cnn::{ClassifierConfig, DefectClassifier};
pub use training::init::BackendInitializer;
pub use training::orchestrator::{Orchestrator, RuntimeOptions, TestOutcome, TrainOutcome};
pub use training::pipeline::FittedModel;
pub use training::profile::{Architecture, HardwareProfile, TrainingProfile};
pub use utils::error::{PcbClassifyError, Result};
pub use utils::metrics::{ConfusionMatrix, EvaluationReport, Metrics};

/// Default dataset root directory
pub const DEFAULT_DATASET_ROOT: &str = "PCB_detect_6_700_yolo";

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
