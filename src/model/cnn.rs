//! CNN Model Architecture for PCB Defect Classification
//!
//! Implements a convolutional classifier on the Burn framework in three
//! sizes (standard, compat, minimal) so the training initializer can step
//! down to a cheaper architecture when the preferred one cannot be built.

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
        Relu,
    },
    tensor::{backend::Backend, Tensor},
};
use serde::{Deserialize, Serialize};

use crate::training::profile::Architecture;

/// Configuration for the defect classifier CNN
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Number of output classes
    pub num_classes: usize,

    /// Input image size (width and height, assumed square)
    pub input_size: usize,

    /// Number of input channels (3 for RGB)
    pub in_channels: usize,

    /// Base number of convolutional filters; doubles each block
    pub base_filters: usize,

    /// Number of convolutional blocks
    pub num_blocks: usize,

    /// Hidden width of the fully connected head
    pub fc_width: usize,

    /// Dropout rate for regularization (0.0 to 1.0)
    pub dropout_rate: f64,
}

impl ClassifierConfig {
    /// Configuration for one of the three architecture tiers.
    pub fn for_architecture(architecture: Architecture, num_classes: usize) -> Self {
        match architecture {
            Architecture::Standard => Self {
                num_classes,
                input_size: 128,
                in_channels: 3,
                base_filters: 32,
                num_blocks: 4,
                fc_width: 256,
                dropout_rate: 0.3,
            },
            Architecture::Compat => Self {
                num_classes,
                input_size: 96,
                in_channels: 3,
                base_filters: 16,
                num_blocks: 3,
                fc_width: 128,
                dropout_rate: 0.3,
            },
            Architecture::Minimal => Self {
                num_classes,
                input_size: 64,
                in_channels: 3,
                base_filters: 8,
                num_blocks: 2,
                fc_width: 64,
                dropout_rate: 0.2,
            },
        }
    }

    /// Validate the configuration.
    ///
    /// This is the constructible/non-constructible signal the backend
    /// initializer probes before committing to a profile.
    pub fn validate(&self) -> Result<(), String> {
        if self.num_classes == 0 {
            return Err("num_classes must be greater than 0".to_string());
        }

        if self.input_size == 0 || self.input_size % 32 != 0 {
            return Err("input_size must be a positive multiple of 32".to_string());
        }

        if self.num_blocks == 0 {
            return Err("at least one convolutional block is required".to_string());
        }

        // Each block halves the spatial size; the feature map must survive.
        if self.input_size >> self.num_blocks == 0 {
            return Err(format!(
                "input_size {} is too small for {} pooling blocks",
                self.input_size, self.num_blocks
            ));
        }

        if self.base_filters == 0 || self.fc_width == 0 {
            return Err("filter and FC widths must be greater than 0".to_string());
        }

        if self.dropout_rate < 0.0 || self.dropout_rate >= 1.0 {
            return Err("dropout_rate must be in range [0.0, 1.0)".to_string());
        }

        Ok(())
    }

    /// Channel count after the last convolutional block.
    fn final_channels(&self) -> usize {
        self.base_filters << (self.num_blocks - 1)
    }
}

/// A CNN block with Conv2d, BatchNorm, ReLU, and optional MaxPool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B, 2>,
    pub relu: Relu,
    pub pool: Option<MaxPool2d>,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        with_pool: bool,
        device: &B::Device,
    ) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        let bn = BatchNormConfig::new(out_channels).init(device);

        let pool = if with_pool {
            Some(MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init())
        } else {
            None
        };

        Self {
            conv,
            bn,
            relu: Relu::new(),
            pool,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);

        match &self.pool {
            Some(pool) => pool.forward(x),
            None => x,
        }
    }
}

/// PCB Defect Classifier CNN
///
/// Architecture:
/// - N convolutional blocks with doubling filter counts, each halving the
///   spatial resolution
/// - Global average pooling
/// - Fully connected head with dropout
#[derive(Module, Debug)]
pub struct DefectClassifier<B: Backend> {
    pub blocks: Vec<ConvBlock<B>>,
    pub global_pool: AdaptiveAvgPool2d,
    pub fc1: Linear<B>,
    pub dropout: Dropout,
    pub fc2: Linear<B>,

    num_classes: usize,
}

impl<B: Backend> DefectClassifier<B> {
    /// Build a classifier from a validated configuration.
    pub fn new(config: &ClassifierConfig, device: &B::Device) -> Self {
        let mut blocks = Vec::with_capacity(config.num_blocks);
        let mut in_channels = config.in_channels;
        let mut out_channels = config.base_filters;
        for _ in 0..config.num_blocks {
            blocks.push(ConvBlock::new(in_channels, out_channels, 3, true, device));
            in_channels = out_channels;
            out_channels *= 2;
        }

        let global_pool = AdaptiveAvgPool2dConfig::new([1, 1]).init();

        let fc1 = LinearConfig::new(config.final_channels(), config.fc_width).init(device);
        let dropout = DropoutConfig::new(config.dropout_rate).init();
        let fc2 = LinearConfig::new(config.fc_width, config.num_classes).init(device);

        Self {
            blocks,
            global_pool,
            fc1,
            dropout,
            fc2,
            num_classes: config.num_classes,
        }
    }

    /// Forward pass through the network.
    ///
    /// Input shape [batch, 3, size, size], output logits [batch, num_classes].
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = x;
        for block in &self.blocks {
            x = block.forward(x);
        }

        // [B, C, H, W] -> [B, C, 1, 1] -> [B, C]
        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        let x = self.fc1.forward(x);
        let x = Relu::new().forward(x);
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let logits = self.forward(x);
        burn::tensor::activation::softmax(logits, 1)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}
