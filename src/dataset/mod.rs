//! Dataset layer: manifest parsing, YOLO split scanning, label encoding,
//! and tensor batching.

pub mod burn_dataset;
pub mod config;
pub mod scanner;

pub use burn_dataset::{
    load_image_chw, DefectBatch, DefectBatcher, EncodedDataset, LabelCodec, IMAGENET_MEAN,
    IMAGENET_STD,
};
pub use config::{ClassCatalog, DatasetConfig};
pub use scanner::{scan, Sample, SampleSet};
