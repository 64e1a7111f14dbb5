//! Model layer: the defect classifier CNN and its configuration.

pub mod cnn;

pub use cnn::{ClassifierConfig, ConvBlock, DefectClassifier};
