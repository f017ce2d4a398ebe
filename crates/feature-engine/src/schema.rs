//! Canonical feature column layout

use crate::features::FeatureVector;
use eeg_core::{Band, EegError, PipelineConfig};
use serde::{Deserialize, Serialize};

/// Bumped whenever the column naming scheme changes
pub const SCHEMA_VERSION: u32 = 1;

/// Column name for a 0-based channel index and a band name
pub fn feature_name(channel_index: usize, band_name: &str) -> String {
    format!("channel{}_{}", channel_index + 1, band_name)
}

/// Ordered feature columns for one (channel count, band set) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    version: u32,
    channel_count: usize,
    bands: Vec<String>,
    columns: Vec<String>,
}

impl FeatureSchema {
    /// Enumerate columns channel-major, bands in configured order
    pub fn generate(channel_count: usize, bands: &[Band]) -> Self {
        let columns = (0..channel_count)
            .flat_map(|ch| bands.iter().map(move |band| feature_name(ch, &band.name)))
            .collect();

        Self {
            version: SCHEMA_VERSION,
            channel_count,
            bands: bands.iter().map(|b| b.name.clone()).collect(),
            columns,
        }
    }

    /// Schema for the configured channel count and bands
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::generate(config.expected_channels, &config.bands)
    }

    /// Naming-scheme version
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Channel count the schema was generated for
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Band names in column order
    pub fn bands(&self) -> &[String] {
        &self.bands
    }

    /// Ordered column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of feature columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether rows written under `other` can be read under `self`
    pub fn is_compatible_with(&self, other: &FeatureSchema) -> bool {
        self.version == other.version && self.columns == other.columns
    }

    /// Check a vector's keys against the schema and return its values in column order
    pub fn align(&self, vector: &FeatureVector) -> Result<Vec<f64>, EegError> {
        if vector.names() != self.columns.as_slice() {
            return Err(EegError::InvalidShape(format!(
                "feature vector has {} keys, schema expects {} columns in canonical order",
                vector.len(),
                self.columns.len()
            )));
        }
        Ok(vector.values().to_vec())
    }
}
