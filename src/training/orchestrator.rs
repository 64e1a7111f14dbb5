//! Training Orchestrator
//!
//! Owns the end-to-end run: scan the dataset splits, select a training
//! profile through the fallback ladder, build and fit the pipeline,
//! evaluate, persist, reload, and serve single predictions. Steps run
//! strictly sequentially; the fitted model is an opaque handle the
//! orchestrator keeps for the rest of the run.

use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::backend::{AutodiffBackend, Backend};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::dataset::burn_dataset::{DefectBatcher, EncodedDataset, LabelCodec};
use crate::dataset::config::DatasetConfig;
use crate::dataset::scanner::{scan, SampleSet};
use crate::inference::predictor::{predict_one, PredictionResult};
use crate::model::cnn::{ClassifierConfig, DefectClassifier};
use crate::training::init::BackendInitializer;
use crate::training::pipeline::{predict_dataset, FittedModel, Pipeline};
use crate::training::profile::TrainingProfile;
use crate::utils::error::{PcbClassifyError, Result};
use crate::utils::metrics::{EvaluationReport, Metrics};

/// Name of the Burn record file inside an artifact directory.
const MODEL_FILE: &str = "model";

/// Name of the JSON sidecar describing the artifact.
const SCHEMA_FILE: &str = "schema.json";

/// Per-run knobs, passed explicitly at construction.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Seed for epoch shuffling
    pub seed: u64,
    /// Directory the manifest's relative split paths resolve under
    pub dataset_root: PathBuf,
    /// Directory model artifacts are written to
    pub output_dir: PathBuf,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            dataset_root: PathBuf::from("PCB_detect_6_700_yolo"),
            output_dir: PathBuf::from("output"),
        }
    }
}

/// JSON sidecar saved next to the model record. `load` and `predict_one`
/// must match it: the vocabulary and architecture are not negotiable after
/// training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSchema {
    pub class_names: Vec<String>,
    pub profile: TrainingProfile,
    pub input_size: usize,
    pub version: String,
    pub saved_at: String,
}

/// Result of the `test` operation.
#[derive(Debug)]
pub enum TestOutcome {
    /// The test split is absent or empty; evaluation was not attempted
    NoData,
    /// Evaluation ran; metrics attached
    Report(EvaluationReport),
}

/// Result of the `train` operation.
pub struct TrainOutcome<B: Backend> {
    pub model: FittedModel<B>,
    /// Validation metrics, absent when the validation split was empty
    pub validation_report: Option<EvaluationReport>,
}

/// Drives the scan -> initialize -> build -> fit -> evaluate sequence.
pub struct Orchestrator<B: AutodiffBackend> {
    config: DatasetConfig,
    options: RuntimeOptions,
    initializer: BackendInitializer,
    device: B::Device,
}

impl<B: AutodiffBackend> Orchestrator<B> {
    pub fn new(
        config: DatasetConfig,
        options: RuntimeOptions,
        initializer: BackendInitializer,
    ) -> Self {
        Self {
            config,
            options,
            initializer,
            device: B::Device::default(),
        }
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// Scan one split of the dataset.
    pub fn scan_split(&self, split: &str) -> SampleSet {
        let entry = match split {
            "train" => &self.config.train,
            "val" => &self.config.val,
            _ => &self.config.test,
        };
        scan(split, entry, &self.config, &self.options.dataset_root)
    }

    /// Run the full training sequence.
    ///
    /// Fails fast with `BackendUnavailable` before any fit is attempted if
    /// no ladder candidate can be constructed. Fit errors are logged with a
    /// remediation hint and surfaced, never auto-retried.
    pub fn train(&self) -> Result<TrainOutcome<B::InnerBackend>> {
        let train_set = self.scan_split("train");
        let val_set = self.scan_split("val");
        info!(
            train = train_set.len(),
            val = val_set.len(),
            "Dataset scanned"
        );

        let profile = self.initializer.initialize(self.config.nc)?;
        let codec = LabelCodec::from_class_names(&self.config.names);

        let pipeline =
            Pipeline::<B>::build(profile, codec, &val_set, self.device.clone())?;

        let model = pipeline.fit(&train_set, self.options.seed).map_err(|e| {
            error!(
                "Training failed: {}. Retry with a smaller batch size or the \
                 minimal architecture, and verify the dataset images are readable.",
                e
            );
            e
        })?;

        let validation_report = if val_set.is_empty() {
            warn!("Validation split is empty; skipping validation metrics");
            None
        } else {
            // A metrics failure must not discard the fitted model.
            match self.evaluate(&model, &val_set) {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!("Validation evaluation failed: {}", e);
                    None
                }
            }
        };

        Ok(TrainOutcome {
            model,
            validation_report,
        })
    }

    /// Evaluate a fitted model on a sample set.
    pub fn evaluate(
        &self,
        model: &FittedModel<B::InnerBackend>,
        set: &SampleSet,
    ) -> Result<EvaluationReport> {
        let dataset = EncodedDataset::encode(set, &model.codec, model.input_size);
        if dataset.is_empty() {
            return Err(PcbClassifyError::EvaluationFailed(format!(
                "no usable samples in the {} split",
                set.split
            )));
        }

        let batcher =
            DefectBatcher::<B::InnerBackend>::new(self.device.clone(), model.input_size);
        let (predictions, truth, scores) = predict_dataset(
            &model.classifier,
            &dataset,
            &batcher,
            model.profile.batch_size,
        )?;

        let metrics =
            Metrics::from_predictions(&predictions, &truth, &scores, model.codec.names());
        Ok(EvaluationReport::new(metrics))
    }

    /// Persist a fitted model: Burn record plus JSON schema sidecar.
    ///
    /// Returns the artifact directory. A save failure leaves the in-memory
    /// model untouched and usable.
    pub fn save(&self, model: &FittedModel<B::InnerBackend>) -> Result<PathBuf> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let artifact_dir = self
            .options
            .output_dir
            .join(format!("pcb_classifier_{}", timestamp));
        fs::create_dir_all(&artifact_dir)?;

        model
            .classifier
            .clone()
            .save_file(artifact_dir.join(MODEL_FILE), &CompactRecorder::new())
            .map_err(|e| PcbClassifyError::SaveFailed(format!("{:?}", e)))?;

        let schema = ModelSchema {
            class_names: model.codec.names().to_vec(),
            profile: model.profile.clone(),
            input_size: model.input_size,
            version: env!("CARGO_PKG_VERSION").to_string(),
            saved_at: Local::now().to_rfc3339(),
        };
        let json = serde_json::to_string_pretty(&schema)
            .map_err(|e| PcbClassifyError::SaveFailed(e.to_string()))?;
        fs::write(artifact_dir.join(SCHEMA_FILE), json)
            .map_err(|e| PcbClassifyError::SaveFailed(e.to_string()))?;

        info!("Model saved to {}", artifact_dir.display());
        Ok(artifact_dir)
    }

    /// Reconstruct a fitted model from a saved artifact directory.
    pub fn load(&self, artifact_dir: &Path) -> Result<FittedModel<B::InnerBackend>> {
        let schema_path = artifact_dir.join(SCHEMA_FILE);
        let json = fs::read_to_string(&schema_path).map_err(|e| {
            PcbClassifyError::Artifact(format!("cannot read {}: {}", schema_path.display(), e))
        })?;
        let schema: ModelSchema = serde_json::from_str(&json)
            .map_err(|e| PcbClassifyError::Artifact(format!("invalid schema: {}", e)))?;

        if schema.class_names.is_empty() {
            return Err(PcbClassifyError::Artifact(
                "schema declares no classes".to_string(),
            ));
        }

        let config = ClassifierConfig::for_architecture(
            schema.profile.architecture,
            schema.class_names.len(),
        );
        let classifier = DefectClassifier::<B::InnerBackend>::new(&config, &self.device)
            .load_file(
                artifact_dir.join(MODEL_FILE),
                &CompactRecorder::new(),
                &self.device,
            )
            .map_err(|e| PcbClassifyError::Artifact(format!("{:?}", e)))?;

        info!("Model loaded from {}", artifact_dir.display());
        Ok(FittedModel {
            classifier,
            codec: LabelCodec::from_class_names(&schema.class_names),
            profile: schema.profile,
            input_size: schema.input_size,
        })
    }

    /// Evaluate on the test split, short-circuiting when there is nothing
    /// to test.
    pub fn test(&self, model: &FittedModel<B::InnerBackend>) -> Result<TestOutcome> {
        if self.config.test.is_empty() {
            info!("No test split declared in the manifest");
            return Ok(TestOutcome::NoData);
        }

        let test_set = self.scan_split("test");
        if test_set.is_empty() {
            info!("No test data available");
            return Ok(TestOutcome::NoData);
        }

        let report = self.evaluate(model, &test_set)?;
        Ok(TestOutcome::Report(report))
    }

    /// Classify a single image with a fitted model.
    pub fn predict_one(
        &self,
        model: &FittedModel<B::InnerBackend>,
        image_path: &Path,
    ) -> Result<PredictionResult> {
        predict_one(model, image_path, &self.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn config(names: &[&str], test: &str) -> DatasetConfig {
        DatasetConfig {
            train: "./train/images".to_string(),
            val: "./valid/images".to_string(),
            test: test.to_string(),
            nc: names.len(),
            names: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn fitted_minimal(names: &[&str]) -> FittedModel<NdArray> {
        let profile = TrainingProfile::simplified();
        let class_names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        let config = ClassifierConfig::for_architecture(profile.architecture, names.len());
        FittedModel {
            classifier: DefectClassifier::new(&config, &Default::default()),
            codec: LabelCodec::from_class_names(&class_names),
            profile,
            input_size: config.input_size,
        }
    }

    #[test]
    fn test_no_declared_test_split_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::<TestBackend>::new(
            config(&["a", "b"], ""),
            RuntimeOptions {
                seed: 1,
                dataset_root: dir.path().to_path_buf(),
                output_dir: dir.path().join("out"),
            },
            BackendInitializer::with_candidates(vec![TrainingProfile::simplified()]),
        );

        let model = fitted_minimal(&["a", "b"]);
        assert!(matches!(
            orchestrator.test(&model).unwrap(),
            TestOutcome::NoData
        ));
    }

    #[test]
    fn test_empty_test_directory_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::<TestBackend>::new(
            config(&["a", "b"], "./test/images"),
            RuntimeOptions {
                seed: 1,
                dataset_root: dir.path().to_path_buf(),
                output_dir: dir.path().join("out"),
            },
            BackendInitializer::with_candidates(vec![TrainingProfile::simplified()]),
        );

        let model = fitted_minimal(&["a", "b"]);
        assert!(matches!(
            orchestrator.test(&model).unwrap(),
            TestOutcome::NoData
        ));
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::<TestBackend>::new(
            config(&["a", "b", "c"], ""),
            RuntimeOptions {
                seed: 1,
                dataset_root: dir.path().to_path_buf(),
                output_dir: dir.path().join("out"),
            },
            BackendInitializer::with_candidates(vec![TrainingProfile::simplified()]),
        );

        let model = fitted_minimal(&["a", "b", "c"]);
        let artifact_dir = orchestrator.save(&model).unwrap();

        assert!(artifact_dir.join("model.mpk").exists());
        assert!(artifact_dir.join("schema.json").exists());

        let restored = orchestrator.load(&artifact_dir).unwrap();
        assert_eq!(restored.codec.names(), model.codec.names());
        assert_eq!(restored.input_size, model.input_size);
        assert_eq!(restored.profile.name, "simplified");
    }

    #[test]
    fn test_failed_save_leaves_model_usable() {
        let dir = tempfile::tempdir().unwrap();
        // Output directory path is occupied by a regular file.
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, "not a directory").unwrap();

        let orchestrator = Orchestrator::<TestBackend>::new(
            config(&["a", "b"], ""),
            RuntimeOptions {
                seed: 1,
                dataset_root: dir.path().to_path_buf(),
                output_dir: blocked,
            },
            BackendInitializer::with_candidates(vec![TrainingProfile::simplified()]),
        );

        let model = fitted_minimal(&["a", "b"]);
        assert!(orchestrator.save(&model).is_err());

        // The same in-memory model saves fine once the destination is valid.
        let orchestrator_ok = Orchestrator::<TestBackend>::new(
            config(&["a", "b"], ""),
            RuntimeOptions {
                seed: 1,
                dataset_root: dir.path().to_path_buf(),
                output_dir: dir.path().join("out"),
            },
            BackendInitializer::with_candidates(vec![TrainingProfile::simplified()]),
        );
        let artifact_dir = orchestrator_ok.save(&model).unwrap();
        assert!(artifact_dir.join("schema.json").exists());
    }

    #[test]
    fn test_evaluate_without_usable_samples_fails() {
        use crate::dataset::scanner::{Sample, SampleSet};

        let orchestrator = Orchestrator::<TestBackend>::new(
            config(&["a", "b"], ""),
            RuntimeOptions::default(),
            BackendInitializer::with_candidates(vec![TrainingProfile::simplified()]),
        );

        let model = fitted_minimal(&["a", "b"]);
        // Every label falls outside the model's vocabulary, so the encoded
        // set is empty.
        let set = SampleSet {
            split: "val".to_string(),
            samples: vec![Sample {
                image_path: std::path::PathBuf::from("x.jpg"),
                label: "stranger".to_string(),
            }],
        };

        let err = orchestrator.evaluate(&model, &set).unwrap_err();
        assert!(matches!(err, PcbClassifyError::EvaluationFailed(_)));
    }

    #[test]
    fn test_load_missing_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::<TestBackend>::new(
            config(&["a"], ""),
            RuntimeOptions::default(),
            BackendInitializer::with_candidates(vec![TrainingProfile::simplified()]),
        );

        let err = orchestrator.load(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, PcbClassifyError::Artifact(_)));
    }
}
