//! Training Matrix

use crate::{TrainingError, N_CLASSES};
use std::collections::HashSet;
use storage::FeatureTable;

/// Feature matrix with labels and group ids, rows aligned
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub feature_names: Vec<String>,
    /// One row per sample
    pub features: Vec<Vec<f64>>,
    /// Class index per sample (see `MentalState::index`)
    pub labels: Vec<usize>,
    pub groups: Vec<String>,
}

impl TrainingSet {
    /// Keep only the columns whose name starts with `prefix`
    pub fn from_table(table: &FeatureTable, prefix: &str) -> Result<Self, TrainingError> {
        let selected: Vec<usize> = table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, name)| name.starts_with(prefix))
            .map(|(i, _)| i)
            .collect();

        if selected.is_empty() {
            return Err(TrainingError::NoFeatureColumns {
                prefix: prefix.to_string(),
            });
        }

        Ok(Self {
            feature_names: selected.iter().map(|&i| table.columns[i].clone()).collect(),
            features: table
                .rows
                .iter()
                .map(|row| selected.iter().map(|&i| row.values[i]).collect())
                .collect(),
            labels: table.rows.iter().map(|row| row.label.index()).collect(),
            groups: table.rows.iter().map(|row| row.group_id.clone()).collect(),
        })
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    /// Number of feature columns
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Number of distinct group ids
    pub fn n_groups(&self) -> usize {
        self.groups.iter().collect::<HashSet<_>>().len()
    }

    /// Sample count per class
    pub fn class_counts(&self) -> [usize; N_CLASSES] {
        let mut counts = [0; N_CLASSES];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }

    /// Rows at `indices`, in that order
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            groups: indices.iter().map(|&i| self.groups[i].clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeg_core::MentalState;
    use storage::FeatureRow;

    fn table() -> FeatureTable {
        FeatureTable {
            columns: vec!["channel1_alpha".into(), "quality".into(), "channel1_beta".into()],
            rows: vec![
                FeatureRow {
                    dataset_name: "EMOTIV".into(),
                    group_id: "a".into(),
                    label: MentalState::Drowsy,
                    values: vec![1.0, 99.0, 2.0],
                },
                FeatureRow {
                    dataset_name: "EMOTIV".into(),
                    group_id: "b".into(),
                    label: MentalState::Focused,
                    values: vec![3.0, 98.0, 4.0],
                },
            ],
        }
    }

    #[test]
    fn test_prefix_selects_feature_columns() {
        let set = TrainingSet::from_table(&table(), "channel").unwrap();
        assert_eq!(set.feature_names, vec!["channel1_alpha", "channel1_beta"]);
        assert_eq!(set.features, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(set.labels, vec![2, 0]);
        assert_eq!(set.n_groups(), 2);
        assert_eq!(set.class_counts(), [1, 0, 1]);
    }

    #[test]
    fn test_missing_prefix() {
        assert!(matches!(
            TrainingSet::from_table(&table(), "ch_"),
            Err(TrainingError::NoFeatureColumns { .. })
        ));
    }

    #[test]
    fn test_subset() {
        let set = TrainingSet::from_table(&table(), "channel").unwrap();
        let sub = set.subset(&[1]);
        assert_eq!(sub.n_samples(), 1);
        assert_eq!(sub.groups, vec!["b"]);
    }
}
