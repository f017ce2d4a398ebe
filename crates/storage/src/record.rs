//! Feature Rows

use eeg_core::MentalState;
use serde::{Deserialize, Serialize};

/// One persisted labeled sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Dataset origin tag
    pub dataset_name: String,
    /// Recording or recording+trial the window came from
    pub group_id: String,
    pub label: MentalState,
    /// Feature values in schema column order
    pub values: Vec<f64>,
}

/// Rows loaded for a dataset selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    /// Feature column names in value order
    pub columns: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows were loaded
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row count per label, in [`MentalState::ALL`] order
    pub fn class_counts(&self) -> [usize; 3] {
        let mut counts = [0; 3];
        for row in &self.rows {
            counts[row.label.index()] += 1;
        }
        counts
    }
}
