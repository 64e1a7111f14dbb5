//! Encoded Dataset and Batching
//!
//! Bridges scanned [`SampleSet`]s to Burn tensors: a fixed label codec built
//! from the declared class vocabulary, a lazy image-loading dataset, and a
//! batcher that stacks decoded images into normalized CHW float tensors.

use std::path::{Path, PathBuf};

use burn::prelude::*;
use image::imageops::FilterType;
use tracing::warn;

use crate::dataset::scanner::SampleSet;

/// ImageNet normalization constants (RGB channel means)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet normalization constants (RGB channel standard deviations)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Dense, immutable name <-> index mapping.
///
/// Built once from the full declared class list, so encoding order is the
/// manifest order regardless of which split is encoded first.
#[derive(Debug, Clone)]
pub struct LabelCodec {
    names: Vec<String>,
}

impl LabelCodec {
    pub fn from_class_names(names: &[String]) -> Self {
        Self {
            names: names.to_vec(),
        }
    }

    /// Encode a class name to its dense index, `None` for unknown names.
    pub fn encode(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Decode a dense index back to a class name.
    pub fn decode(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(|s| s.as_str())
    }

    pub fn num_classes(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// One encoded sample: the image stays on disk until batching time.
#[derive(Debug, Clone)]
pub struct EncodedItem {
    pub image_path: PathBuf,
    pub class_idx: usize,
}

/// A split encoded against a [`LabelCodec`], with lazy image decoding.
#[derive(Debug, Clone)]
pub struct EncodedDataset {
    items: Vec<EncodedItem>,
    input_size: usize,
}

impl EncodedDataset {
    /// Encode a sample set. Samples whose label is outside the codec's
    /// vocabulary are dropped with a warning.
    pub fn encode(set: &SampleSet, codec: &LabelCodec, input_size: usize) -> Self {
        let items = set
            .samples
            .iter()
            .filter_map(|sample| match codec.encode(&sample.label) {
                Some(class_idx) => Some(EncodedItem {
                    image_path: sample.image_path.clone(),
                    class_idx,
                }),
                None => {
                    warn!(
                        label = %sample.label,
                        "Dropping sample with label outside the declared vocabulary: {}",
                        sample.image_path.display()
                    );
                    None
                }
            })
            .collect();

        Self { items, input_size }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Decode the item at `index` into (normalized CHW pixels, class index).
    ///
    /// Unreadable or corrupt images yield `None` with a warning so one bad
    /// file never aborts an epoch.
    pub fn get(&self, index: usize) -> Option<(Vec<f32>, usize)> {
        let item = self.items.get(index)?;
        match load_image_chw(&item.image_path, self.input_size) {
            Ok(pixels) => Some((pixels, item.class_idx)),
            Err(e) => {
                warn!(
                    "Skipping unreadable image {}: {}",
                    item.image_path.display(),
                    e
                );
                None
            }
        }
    }

    /// Ground-truth class index at `index`, without decoding the image.
    pub fn class_at(&self, index: usize) -> Option<usize> {
        self.items.get(index).map(|item| item.class_idx)
    }

    /// Image path at `index`.
    pub fn path_at(&self, index: usize) -> Option<&Path> {
        self.items.get(index).map(|item| item.image_path.as_path())
    }
}

/// Decode an image file into ImageNet-normalized CHW floats.
pub fn load_image_chw(path: &Path, input_size: usize) -> Result<Vec<f32>, String> {
    let img = image::open(path).map_err(|e| format!("decode failed: {}", e))?;
    let img = img
        .resize_exact(input_size as u32, input_size as u32, FilterType::Triangle)
        .to_rgb8();

    let pixel_count = input_size * input_size;
    let mut chw = vec![0.0f32; 3 * pixel_count];

    for (x, y, pixel) in img.enumerate_pixels() {
        let offset = y as usize * input_size + x as usize;
        for c in 0..3 {
            let value = pixel.0[c] as f32 / 255.0;
            chw[c * pixel_count + offset] = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    Ok(chw)
}

/// A batch of images and their target class indices.
#[derive(Debug, Clone)]
pub struct DefectBatch<B: Backend> {
    /// Image tensor, shape [batch, 3, size, size]
    pub images: Tensor<B, 4>,
    /// Target class indices, shape [batch]
    pub targets: Tensor<B, 1, Int>,
}

/// Stacks decoded items into device tensors.
#[derive(Debug, Clone)]
pub struct DefectBatcher<B: Backend> {
    device: B::Device,
    input_size: usize,
}

impl<B: Backend> DefectBatcher<B> {
    pub fn new(device: B::Device, input_size: usize) -> Self {
        Self { device, input_size }
    }

    /// Stack already-decoded (pixels, class) pairs into one batch.
    pub fn batch(&self, items: &[(Vec<f32>, usize)]) -> DefectBatch<B> {
        let batch_size = items.len();
        let pixels_per_image = 3 * self.input_size * self.input_size;

        let mut flat = Vec::with_capacity(batch_size * pixels_per_image);
        let mut targets = Vec::with_capacity(batch_size);
        for (pixels, class_idx) in items {
            flat.extend_from_slice(pixels);
            targets.push(*class_idx as i64);
        }

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(
                flat,
                [batch_size, 3, self.input_size, self.input_size],
            ),
            &self.device,
        );
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(targets, [batch_size]),
            &self.device,
        );

        DefectBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::scanner::Sample;
    use burn::backend::NdArray;

    fn names(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_codec_round_trip() {
        let codec = LabelCodec::from_class_names(&names(&["a", "b", "c"]));

        for (idx, name) in ["a", "b", "c"].iter().enumerate() {
            assert_eq!(codec.encode(name), Some(idx));
            assert_eq!(codec.decode(idx), Some(*name));
        }
        assert_eq!(codec.encode("unknown"), None);
        assert_eq!(codec.decode(3), None);
        assert_eq!(codec.num_classes(), 3);
    }

    #[test]
    fn test_encode_drops_unknown_labels() {
        let codec = LabelCodec::from_class_names(&names(&["a"]));
        let set = SampleSet {
            split: "train".to_string(),
            samples: vec![
                Sample {
                    image_path: PathBuf::from("x.jpg"),
                    label: "a".to_string(),
                },
                Sample {
                    image_path: PathBuf::from("y.jpg"),
                    label: "stranger".to_string(),
                },
            ],
        };

        let dataset = EncodedDataset::encode(&set, &codec, 64);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.class_at(0), Some(0));
    }

    #[test]
    fn test_get_on_unreadable_image_is_none() {
        let codec = LabelCodec::from_class_names(&names(&["a"]));
        let set = SampleSet {
            split: "train".to_string(),
            samples: vec![Sample {
                image_path: PathBuf::from("/nonexistent/x.jpg"),
                label: "a".to_string(),
            }],
        };

        let dataset = EncodedDataset::encode(&set, &codec, 64);
        assert!(dataset.get(0).is_none());
    }

    #[test]
    fn test_batch_shapes() {
        let device = Default::default();
        let batcher = DefectBatcher::<NdArray>::new(device, 8);

        let items = vec![
            (vec![0.0f32; 3 * 8 * 8], 0usize),
            (vec![1.0f32; 3 * 8 * 8], 1usize),
        ];
        let batch = batcher.batch(&items);

        assert_eq!(batch.images.dims(), [2, 3, 8, 8]);
        assert_eq!(batch.targets.dims(), [2]);
    }

    #[test]
    fn test_load_image_chw_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("white.png");
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255]));
        img.save(&path).unwrap();

        let pixels = load_image_chw(&path, 4).unwrap();
        assert_eq!(pixels.len(), 3 * 4 * 4);
        // White pixel in channel 0: (1.0 - 0.485) / 0.229
        let expected = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        assert!((pixels[0] - expected).abs() < 1e-5);
    }
}
