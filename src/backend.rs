//! Backend selection
//!
//! Type aliases for the Burn backend used across the binary. The CPU
//! NdArray backend keeps the crate runnable on any host; the fallback
//! ladder handles capability differences above this level.

use burn::backend::{Autodiff, NdArray};

/// Inference backend
pub type DefaultBackend = NdArray<f32>;

/// Training backend (autodiff wrapper around the inference backend)
pub type TrainingBackend = Autodiff<DefaultBackend>;
