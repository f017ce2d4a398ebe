//! EEG Pipeline Core
//!
//! Shared vocabulary for every pipeline stage: the frozen [`PipelineConfig`],
//! frequency [`Band`] definitions, the closed [`MentalState`] label set and
//! the [`EegError`] taxonomy.

mod band;
mod config;
mod error;
mod label;

pub use band::{canonical_bands, Band};
pub use config::{
    ExperimentConfig, FilterConfig, LabelingConfig, PipelineConfig, SpectralConfig,
    StorageConfig, TrainingConfig,
};
pub use error::EegError;
pub use label::MentalState;

/// Dataset tag for continuous EMOTIV recordings
pub const DATASET_EMOTIV: &str = "EMOTIV";

/// Dataset tag for trial-structured DEAP recordings
pub const DATASET_DEAP: &str = "DEAP";
