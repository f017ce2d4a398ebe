//! Training Engine
//!
//! Loads labeled feature rows for a dataset selection, splits them with a
//! grouped k-fold so no recording leaks across partitions, and evaluates a
//! class-balanced random forest on every fold.

mod dataset;
mod engine;
mod forest;
mod kfold;
mod metrics;
mod tree;

pub use dataset::TrainingSet;
pub use engine::{ExperimentReport, FoldReport, TrainingEngine};
pub use forest::{ForestParams, RandomForest};
pub use kfold::{Fold, GroupKFold};
pub use metrics::{accuracy, classification_report, confusion_matrix, macro_f1, ClassReport};
pub use tree::{DecisionTree, TreeParams};

use storage::StorageError;
use thiserror::Error;

/// Number of mental-state classes
pub const N_CLASSES: usize = 3;

/// Errors during training and evaluation
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("No feature columns with prefix '{prefix}'")]
    NoFeatureColumns { prefix: String },
    #[error("Grouped k-fold needs at least 2 groups, found {found}")]
    InsufficientGroups { found: usize },
    #[error("Cannot fit a model on an empty training set")]
    EmptyTrainingSet,
    #[error("Training task failed: {0}")]
    TaskFailed(String),
}
