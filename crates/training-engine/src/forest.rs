//! Random Forest Classifier

use crate::dataset::TrainingSet;
use crate::tree::{DecisionTree, TreeParams};
use crate::{TrainingError, N_CLASSES};
use eeg_core::TrainingConfig;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Random forest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Base seed; tree `i` uses `seed + i`
    pub seed: u64,
    /// Weight classes inversely to their frequency
    pub class_balanced: bool,
}

impl From<&TrainingConfig> for ForestParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            n_trees: config.n_trees,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            seed: config.seed,
            class_balanced: true,
        }
    }
}

/// Bagged ensemble of decision trees with soft voting
#[derive(Debug, Clone)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<DecisionTree>,
}

/// `n / (k × count_c)` for every class present in `labels`
fn balanced_class_weights(labels: &[usize]) -> [f64; N_CLASSES] {
    let mut counts = [0usize; N_CLASSES];
    for &label in labels {
        counts[label] += 1;
    }
    let present = counts.iter().filter(|&&c| c > 0).count() as f64;
    let n = labels.len() as f64;

    let mut weights = [0.0; N_CLASSES];
    for (w, &c) in weights.iter_mut().zip(&counts) {
        if c > 0 {
            *w = n / (present * c as f64);
        }
    }
    weights
}

impl RandomForest {
    /// Create an unfitted forest
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
        }
    }

    /// Train every tree on its own bootstrap sample, in parallel
    pub fn fit(&mut self, data: &TrainingSet) -> Result<(), TrainingError> {
        let n = data.n_samples();
        if n == 0 || data.n_features() == 0 {
            return Err(TrainingError::EmptyTrainingSet);
        }

        let sample_weights: Vec<f64> = if self.params.class_balanced {
            let class_weights = balanced_class_weights(&data.labels);
            data.labels.iter().map(|&l| class_weights[l]).collect()
        } else {
            vec![1.0; n]
        };

        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            max_features: ((data.n_features() as f64).sqrt() as usize).max(1),
        };

        self.trees = (0..self.params.n_trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed.wrapping_add(i as u64));
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit(
                    &data.features,
                    &data.labels,
                    &sample_weights,
                    &bootstrap,
                    &tree_params,
                    &mut rng,
                )
            })
            .collect();

        debug!(
            "Fitted {} trees on {} samples × {} features",
            self.trees.len(),
            n,
            data.n_features()
        );
        Ok(())
    }

    /// Mean of the per-tree class probabilities
    pub fn predict_proba(&self, row: &[f64]) -> [f64; N_CLASSES] {
        let mut probs = [0.0; N_CLASSES];
        if self.trees.is_empty() {
            return probs;
        }
        for tree in &self.trees {
            for (p, t) in probs.iter_mut().zip(tree.predict_proba(row)) {
                *p += t;
            }
        }
        let n = self.trees.len() as f64;
        probs.iter_mut().for_each(|p| *p /= n);
        probs
    }

    /// Most probable class per row; ties go to the lower class index
    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<usize> {
        rows.par_iter()
            .map(|row| {
                let probs = self.predict_proba(row);
                let mut best = 0;
                for c in 1..N_CLASSES {
                    if probs[c] > probs[best] {
                        best = c;
                    }
                }
                best
            })
            .collect()
    }

    /// Number of fitted trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs(per_class: usize) -> TrainingSet {
        let mut set = TrainingSet {
            feature_names: vec!["channel1_alpha".into(), "channel1_beta".into()],
            ..Default::default()
        };
        for class in 0..N_CLASSES {
            for i in 0..per_class {
                let jitter = (i as f64 * 0.37).sin() * 0.3;
                set.features.push(vec![class as f64 * 5.0 + jitter, 1.0 - jitter]);
                set.labels.push(class);
                set.groups.push(format!("g{}", i % 4));
            }
        }
        set
    }

    fn params(n_trees: usize) -> ForestParams {
        ForestParams {
            n_trees,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
            class_balanced: true,
        }
    }

    #[test]
    fn test_balanced_weights() {
        let w = balanced_class_weights(&[0, 0, 0, 1]);
        assert!((w[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((w[1] - 2.0).abs() < 1e-12);
        assert_eq!(w[2], 0.0);
    }

    #[test]
    fn test_fits_separable_blobs() {
        let data = blobs(20);
        let mut forest = RandomForest::new(params(25));
        forest.fit(&data).unwrap();

        assert_eq!(forest.n_trees(), 25);
        let predictions = forest.predict(&[vec![0.0, 1.0], vec![5.0, 1.0], vec![10.0, 1.0]]);
        assert_eq!(predictions, vec![0, 1, 2]);

        let probs = forest.predict_proba(&[5.0, 1.0]);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_seed_same_model() {
        let data = blobs(15);
        let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64 * 0.4, 0.8]).collect();

        let mut a = RandomForest::new(params(10));
        let mut b = RandomForest::new(params(10));
        a.fit(&data).unwrap();
        b.fit(&data).unwrap();

        for row in &rows {
            assert_eq!(a.predict_proba(row), b.predict_proba(row));
        }
    }

    #[test]
    fn test_empty_training_set() {
        let mut forest = RandomForest::new(params(3));
        assert!(matches!(
            forest.fit(&TrainingSet::default()),
            Err(TrainingError::EmptyTrainingSet)
        ));
    }
}
