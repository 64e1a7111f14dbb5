//! Training Pipeline
//!
//! Assembles the stages of a training run in fixed order: label encoding
//! against the declared vocabulary, lazy image loading, the classifier bound
//! to its validation set, and label decoding. `build` is cheap and does no
//! dataset I/O; all heavy work happens in `fit`.

use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, backend::Backend, ElementConversion},
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use crate::dataset::burn_dataset::{DefectBatcher, EncodedDataset, LabelCodec};
use crate::dataset::scanner::SampleSet;
use crate::model::cnn::{ClassifierConfig, DefectClassifier};
use crate::training::profile::TrainingProfile;
use crate::utils::error::{PcbClassifyError, Result};

/// A trained classifier together with everything needed to use it.
#[derive(Debug, Clone)]
pub struct FittedModel<B: Backend> {
    pub classifier: DefectClassifier<B>,
    pub codec: LabelCodec,
    pub profile: TrainingProfile,
    pub input_size: usize,
}

/// An assembled but not yet fitted training pipeline.
pub struct Pipeline<B: AutodiffBackend> {
    profile: TrainingProfile,
    codec: LabelCodec,
    config: ClassifierConfig,
    validation: EncodedDataset,
    model: DefectClassifier<B>,
    device: B::Device,
}

impl<B: AutodiffBackend> Pipeline<B> {
    /// Assemble the pipeline stages for a selected profile.
    ///
    /// The vocabulary comes from the codec (the full declared class list),
    /// never from whichever sample set happens to be encoded first.
    pub fn build(
        profile: TrainingProfile,
        codec: LabelCodec,
        validation: &SampleSet,
        device: B::Device,
    ) -> Result<Self> {
        let config = ClassifierConfig::for_architecture(profile.architecture, codec.num_classes());
        config
            .validate()
            .map_err(PcbClassifyError::TrainingFailed)?;

        let model = DefectClassifier::new(&config, &device);
        let validation = EncodedDataset::encode(validation, &codec, config.input_size);

        Ok(Self {
            profile,
            codec,
            config,
            validation,
            model,
            device,
        })
    }

    /// Fit the classifier on the training set.
    ///
    /// Blocking, non-cancellable. Epoch order is shuffled with a seeded RNG;
    /// validation accuracy drives early stopping with the profile's patience
    /// and min-delta settings.
    pub fn fit(self, train: &SampleSet, seed: u64) -> Result<FittedModel<B::InnerBackend>> {
        let train_dataset = EncodedDataset::encode(train, &self.codec, self.config.input_size);
        if train_dataset.is_empty() {
            return Err(PcbClassifyError::TrainingFailed(
                "training set is empty".to_string(),
            ));
        }

        let batcher = DefectBatcher::<B>::new(self.device.clone(), self.config.input_size);
        let valid_batcher =
            DefectBatcher::<B::InnerBackend>::new(self.device.clone(), self.config.input_size);

        let mut model = self.model;
        let mut optimizer = AdamConfig::new().init();
        let mut epoch_rng = ChaCha8Rng::seed_from_u64(seed);

        let batch_size = self.profile.batch_size.max(1);
        let mut best_val_acc = f64::NEG_INFINITY;
        let mut best_model: Option<DefectClassifier<B::InnerBackend>> = None;
        let mut epochs_without_improvement = 0usize;

        info!(
            profile = %self.profile.describe(),
            train_samples = train_dataset.len(),
            val_samples = self.validation.len(),
            epochs = self.profile.epochs,
            batch_size = batch_size,
            "Starting training"
        );

        for epoch in 0..self.profile.epochs {
            let mut indices: Vec<usize> = (0..train_dataset.len()).collect();
            indices.shuffle(&mut epoch_rng);

            let num_batches = (indices.len() + batch_size - 1) / batch_size;
            let mut epoch_loss = 0.0f64;
            let mut correct = 0usize;
            let mut seen = 0usize;

            for batch_idx in 0..num_batches {
                let start = batch_idx * batch_size;
                let end = (start + batch_size).min(indices.len());
                let items: Vec<_> = indices[start..end]
                    .iter()
                    .filter_map(|&i| train_dataset.get(i))
                    .collect();

                if items.is_empty() {
                    continue;
                }

                let batch = batcher.batch(&items);

                let output = model.forward(batch.images.clone());
                let loss = CrossEntropyLossConfig::new()
                    .init(&output.device())
                    .forward(output.clone(), batch.targets.clone());

                let loss_value: f64 = loss.clone().into_scalar().elem();
                if !loss_value.is_finite() {
                    return Err(PcbClassifyError::TrainingFailed(format!(
                        "loss diverged at epoch {} batch {}",
                        epoch + 1,
                        batch_idx + 1
                    )));
                }
                epoch_loss += loss_value;

                let predictions = output.argmax(1).squeeze::<1>(1);
                let batch_correct: i64 = predictions
                    .equal(batch.targets.clone())
                    .int()
                    .sum()
                    .into_scalar()
                    .elem();
                correct += batch_correct as usize;
                seen += batch.targets.dims()[0];

                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optimizer.step(self.profile.learning_rate, model, grads);
            }

            let avg_loss = epoch_loss / num_batches.max(1) as f64;
            let train_acc = 100.0 * correct as f64 / seen.max(1) as f64;

            if self.validation.is_empty() {
                info!(
                    epoch = epoch + 1,
                    loss = format!("{:.4}", avg_loss),
                    train_acc = format!("{:.2}%", train_acc),
                    "Epoch complete (no validation set)"
                );
                continue;
            }

            let inner_model = model.valid();
            let (predictions, truth, _) = predict_dataset(
                &inner_model,
                &self.validation,
                &valid_batcher,
                batch_size,
            )?;
            let val_acc = if truth.is_empty() {
                0.0
            } else {
                100.0
                    * predictions
                        .iter()
                        .zip(truth.iter())
                        .filter(|(p, g)| p == g)
                        .count() as f64
                    / truth.len() as f64
            };

            let improved = val_acc > best_val_acc + self.profile.min_delta;
            info!(
                epoch = epoch + 1,
                loss = format!("{:.4}", avg_loss),
                train_acc = format!("{:.2}%", train_acc),
                val_acc = format!("{:.2}%", val_acc),
                best = improved,
                "Epoch complete"
            );

            if improved {
                best_val_acc = val_acc;
                best_model = Some(inner_model);
                epochs_without_improvement = 0;
            } else {
                epochs_without_improvement += 1;
                if epochs_without_improvement >= self.profile.patience {
                    info!(
                        epoch = epoch + 1,
                        patience = self.profile.patience,
                        "Early stopping: validation accuracy stopped improving"
                    );
                    break;
                }
            }
        }

        let classifier = match best_model {
            Some(best) => best,
            None => {
                if !self.validation.is_empty() {
                    warn!("No epoch improved validation accuracy; keeping final weights");
                }
                model.valid()
            }
        };

        Ok(FittedModel {
            classifier,
            codec: self.codec,
            profile: self.profile,
            input_size: self.config.input_size,
        })
    }
}

/// Run inference over a whole encoded dataset.
///
/// Returns aligned vectors of predicted class indices, ground-truth indices,
/// and full softmax score rows. Unreadable images are skipped.
pub fn predict_dataset<B: Backend>(
    model: &DefectClassifier<B>,
    dataset: &EncodedDataset,
    batcher: &DefectBatcher<B>,
    batch_size: usize,
) -> Result<(Vec<usize>, Vec<usize>, Vec<Vec<f32>>)> {
    let num_classes = model.num_classes();
    let mut predictions = Vec::new();
    let mut truth = Vec::new();
    let mut scores = Vec::new();

    for start in (0..dataset.len()).step_by(batch_size.max(1)) {
        let end = (start + batch_size.max(1)).min(dataset.len());
        let items: Vec<_> = (start..end).filter_map(|i| dataset.get(i)).collect();
        if items.is_empty() {
            continue;
        }

        let batch = batcher.batch(&items);
        let probs = model.forward_softmax(batch.images);
        let rows: Vec<f32> = probs
            .into_data()
            .to_vec()
            .map_err(|e| PcbClassifyError::EvaluationFailed(format!("{:?}", e)))?;

        for (row, (_, class_idx)) in rows.chunks(num_classes).zip(items.iter()) {
            let predicted = argmax(row);
            predictions.push(predicted);
            truth.push(*class_idx);
            scores.push(row.to_vec());
        }
    }

    Ok((predictions, truth, scores))
}

/// Index of the largest score in a row.
pub fn argmax(scores: &[f32]) -> usize {
    scores
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::profile::Architecture;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
        assert_eq!(argmax(&[0.9]), 0);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn test_build_does_no_io() {
        let codec = LabelCodec::from_class_names(&[
            "a".to_string(),
            "b".to_string(),
        ]);
        let validation = SampleSet {
            split: "val".to_string(),
            samples: Vec::new(),
        };

        let pipeline = Pipeline::<TestBackend>::build(
            TrainingProfile::simplified(),
            codec,
            &validation,
            Default::default(),
        )
        .unwrap();

        assert_eq!(pipeline.profile.architecture, Architecture::Minimal);
        assert_eq!(pipeline.config.input_size, 64);
    }

    #[test]
    fn test_fit_tolerates_zero_batch_size() {
        use crate::dataset::scanner::Sample;

        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("sample.png");
        let img = image::RgbImage::from_pixel(64, 64, image::Rgb([120, 40, 40]));
        img.save(&image_path).unwrap();

        let codec = LabelCodec::from_class_names(&["a".to_string()]);
        let train = SampleSet {
            split: "train".to_string(),
            samples: vec![Sample {
                image_path,
                label: "a".to_string(),
            }],
        };
        let empty_val = SampleSet {
            split: "val".to_string(),
            samples: Vec::new(),
        };

        let mut profile = TrainingProfile::simplified();
        profile.batch_size = 0;

        let pipeline =
            Pipeline::<TestBackend>::build(profile, codec, &empty_val, Default::default())
                .unwrap();
        let fitted = pipeline.fit(&train, 3).unwrap();
        assert_eq!(fitted.codec.num_classes(), 1);
    }

    #[test]
    fn test_fit_rejects_empty_training_set() {
        let codec = LabelCodec::from_class_names(&["a".to_string()]);
        let empty = SampleSet {
            split: "train".to_string(),
            samples: Vec::new(),
        };

        let pipeline = Pipeline::<TestBackend>::build(
            TrainingProfile::simplified(),
            codec,
            &empty,
            Default::default(),
        )
        .unwrap();

        let err = pipeline.fit(&empty, 42).unwrap_err();
        assert!(matches!(err, PcbClassifyError::TrainingFailed(_)));
    }
}
