//! Training layer: profiles, the fallback initializer, the pipeline, and
//! the run orchestrator.

pub mod init;
pub mod orchestrator;
pub mod pipeline;
pub mod profile;

pub use init::BackendInitializer;
pub use orchestrator::{
    ModelSchema, Orchestrator, RuntimeOptions, TestOutcome, TrainOutcome,
};
pub use pipeline::{FittedModel, Pipeline};
pub use profile::{Architecture, HardwareProfile, TrainingProfile};
