//! Experiment Runner

use crate::dataset::TrainingSet;
use crate::forest::{ForestParams, RandomForest};
use crate::kfold::GroupKFold;
use crate::metrics::{accuracy, classification_report, confusion_matrix, macro_f1, ClassReport};
use crate::{TrainingError, N_CLASSES};
use eeg_core::{ExperimentConfig, MentalState, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::FeatureStore;
use tracing::{info, warn};

/// Metrics of one grouped fold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldReport {
    /// 1-based fold number
    pub fold: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub accuracy: f64,
    pub macro_f1: f64,
    /// `[true][predicted]` in `MentalState::ALL` order
    pub confusion: [[usize; N_CLASSES]; N_CLASSES],
    pub per_class: Vec<ClassReport>,
}

/// Outcome of one experiment over a dataset selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub name: String,
    pub datasets: Vec<String>,
    pub n_samples: usize,
    pub n_groups: usize,
    /// Rows per label in `MentalState::ALL` order
    pub class_counts: [usize; N_CLASSES],
    pub folds: Vec<FoldReport>,
    pub mean_accuracy: f64,
    pub mean_macro_f1: f64,
}

/// Runs grouped cross-validation experiments against a feature store
#[derive(Clone)]
pub struct TrainingEngine {
    config: Arc<PipelineConfig>,
}

impl TrainingEngine {
    /// Create a new training engine
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    /// Load the experiment's datasets and evaluate them.
    ///
    /// Returns `Ok(None)` when the selection has no rows or fewer than two
    /// groups; that is reported, not treated as a failure.
    pub async fn run_experiment(
        &self,
        store: &dyn FeatureStore,
        experiment: &ExperimentConfig,
    ) -> Result<Option<ExperimentReport>, TrainingError> {
        info!("=== Experiment: {} ===", experiment.name);

        let table = store.load(&experiment.datasets).await?;
        if table.is_empty() {
            warn!("No data found for {:?}, skipping", experiment.datasets);
            return Ok(None);
        }

        let data = TrainingSet::from_table(&table, &self.config.training.feature_prefix)?;
        info!(
            "Loaded {} samples, {} features, {} groups",
            data.n_samples(),
            data.n_features(),
            data.n_groups()
        );
        let counts = data.class_counts();
        for label in MentalState::ALL {
            info!("  {}: {}", label, counts[label.index()]);
        }

        if data.n_groups() < 2 {
            warn!(
                "Only {} group(s) in {:?}, cannot run grouped evaluation",
                data.n_groups(),
                experiment.datasets
            );
            return Ok(None);
        }

        let engine = self.clone();
        let experiment = experiment.clone();
        tokio::task::spawn_blocking(move || engine.evaluate(&experiment, &data))
            .await
            .map_err(|e| TrainingError::TaskFailed(e.to_string()))?
            .map(Some)
    }

    /// Grouped k-fold evaluation of a fresh forest per fold
    pub fn evaluate(
        &self,
        experiment: &ExperimentConfig,
        data: &TrainingSet,
    ) -> Result<ExperimentReport, TrainingError> {
        let kfold = GroupKFold::new(self.config.training.n_folds);
        let folds = kfold.split(&data.groups)?;
        if folds.len() < self.config.training.n_folds {
            warn!(
                "Reducing folds from {} to {} (distinct groups)",
                self.config.training.n_folds,
                folds.len()
            );
        }

        let params = ForestParams::from(&self.config.training);
        let mut reports = Vec::with_capacity(folds.len());

        for (k, fold) in folds.iter().enumerate() {
            let train = data.subset(&fold.train);
            let test = data.subset(&fold.test);

            let mut forest = RandomForest::new(params.clone());
            forest.fit(&train)?;
            let predicted = forest.predict(&test.features);

            let report = FoldReport {
                fold: k + 1,
                train_size: train.n_samples(),
                test_size: test.n_samples(),
                accuracy: accuracy(&test.labels, &predicted),
                macro_f1: macro_f1(&test.labels, &predicted),
                confusion: confusion_matrix(&test.labels, &predicted),
                per_class: classification_report(&test.labels, &predicted),
            };

            info!(
                "Fold {}: accuracy={:.3} macro_f1={:.3} (train={}, test={})",
                report.fold, report.accuracy, report.macro_f1, report.train_size, report.test_size
            );
            info!("Fold {} confusion matrix: {:?}", report.fold, report.confusion);
            for class in &report.per_class {
                info!(
                    "  {:<10} precision={:.2} recall={:.2} f1={:.2} support={}",
                    class.label.as_str(),
                    class.precision,
                    class.recall,
                    class.f1,
                    class.support
                );
            }
            reports.push(report);
        }

        let n = reports.len() as f64;
        let mean_accuracy = reports.iter().map(|r| r.accuracy).sum::<f64>() / n;
        let mean_macro_f1 = reports.iter().map(|r| r.macro_f1).sum::<f64>() / n;
        info!(
            "{}: mean accuracy={:.3} mean macro_f1={:.3}",
            experiment.name, mean_accuracy, mean_macro_f1
        );

        Ok(ExperimentReport {
            name: experiment.name.clone(),
            datasets: experiment.datasets.clone(),
            n_samples: data.n_samples(),
            n_groups: data.n_groups(),
            class_counts: data.class_counts(),
            folds: reports,
            mean_accuracy,
            mean_macro_f1,
        })
    }
}
