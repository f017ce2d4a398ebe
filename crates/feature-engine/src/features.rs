//! Feature Vector Assembly

use crate::filter::Preprocessor;
use crate::schema::feature_name;
use crate::spectral::WelchEstimator;
use eeg_core::{EegError, PipelineConfig};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// Band power per (channel, band), keyed `channel{i}_{band}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Pair keys with values; both must have the same length
    pub fn new(names: Vec<String>, values: Vec<f64>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }

    /// Keys in insertion order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Values in key order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Look up one feature by key
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    /// Iterate (key, value) pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Turns one epoch (channels × samples) into a [`FeatureVector`]
pub struct FeatureExtractor {
    config: Arc<PipelineConfig>,
    preprocessor: Preprocessor,
    estimator: WelchEstimator,
}

impl FeatureExtractor {
    /// Create a new feature extractor. Fails if the filter cannot be designed.
    pub fn new(config: Arc<PipelineConfig>) -> Result<Self, EegError> {
        Ok(Self {
            preprocessor: Preprocessor::from_config(&config)?,
            estimator: WelchEstimator::from_config(&config),
            config,
        })
    }

    /// Filter every channel, then integrate its spectrum over each band.
    ///
    /// `channel_count` must equal the number of rows in `epoch`; a mismatch is
    /// an [`EegError::InvalidShape`], never a truncation.
    pub fn extract(
        &mut self,
        epoch: ArrayView2<'_, f64>,
        channel_count: usize,
    ) -> Result<FeatureVector, EegError> {
        if epoch.nrows() != channel_count {
            return Err(EegError::InvalidShape(format!(
                "epoch has {} channels, expected {}",
                epoch.nrows(),
                channel_count
            )));
        }

        let bands = &self.config.bands;
        let mut names = Vec::with_capacity(channel_count * bands.len());
        let mut values = Vec::with_capacity(channel_count * bands.len());

        for (ch, row) in epoch.rows().into_iter().enumerate() {
            let filtered = self.preprocessor.apply(&row.to_vec());
            let spectrum = self.estimator.psd(&filtered);
            for band in bands {
                names.push(feature_name(ch, &band.name));
                values.push(spectrum.band_power(band));
            }
        }

        trace!("Extracted {} features from {} samples", values.len(), epoch.ncols());
        Ok(FeatureVector::new(names, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FeatureSchema;
    use ndarray::Array2;
    use proptest::prelude::*;

    fn synthetic_epoch(channels: usize, samples: usize) -> Array2<f64> {
        Array2::from_shape_fn((channels, samples), |(ch, i)| {
            let t = i as f64 / 128.0;
            let freq = 2.0 + 2.0 * ch as f64;
            (2.0 * std::f64::consts::PI * freq * t).sin() + 0.1 * ch as f64
        })
    }

    #[test]
    fn test_feature_extraction() {
        let config = Arc::new(PipelineConfig::default());
        let mut extractor = FeatureExtractor::new(config.clone()).unwrap();

        let epoch = synthetic_epoch(14, config.epoch_samples());
        let features = extractor.extract(epoch.view(), 14).unwrap();

        assert_eq!(features.len(), 56);
        assert!(features.values().iter().all(|v| v.is_finite() && *v >= 0.0));

        // Channel 5 carries a 10 Hz tone
        let alpha = features.get("channel5_alpha").unwrap();
        let delta = features.get("channel5_delta").unwrap();
        assert!(alpha > 10.0 * delta);
    }

    #[test]
    fn test_keys_match_schema() {
        let config = Arc::new(PipelineConfig::default());
        let mut extractor = FeatureExtractor::new(config.clone()).unwrap();
        let schema = FeatureSchema::from_config(&config);

        let features = extractor
            .extract(synthetic_epoch(14, 640).view(), 14)
            .unwrap();
        assert_eq!(features.names(), schema.columns());
        assert_eq!(schema.align(&features).unwrap(), features.values());
    }

    #[test]
    fn test_channel_mismatch_is_invalid_shape() {
        let config = Arc::new(PipelineConfig::default());
        let mut extractor = FeatureExtractor::new(config).unwrap();
        let result = extractor.extract(synthetic_epoch(13, 640).view(), 14);
        assert!(matches!(result, Err(EegError::InvalidShape(_))));
    }

    #[test]
    fn test_invalid_filter_fails_construction() {
        let mut config = PipelineConfig::default();
        config.filter.high_hz = 90.0;
        assert!(matches!(
            FeatureExtractor::new(Arc::new(config)),
            Err(EegError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let config = Arc::new(PipelineConfig::default());
        let mut a = FeatureExtractor::new(config.clone()).unwrap();
        let mut b = FeatureExtractor::new(config).unwrap();
        let epoch = synthetic_epoch(14, 640);
        assert_eq!(a.extract(epoch.view(), 14).unwrap(), b.extract(epoch.view(), 14).unwrap());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_builder_matches_schema(channels in 1usize..20) {
            let config = Arc::new(PipelineConfig::default());
            let mut extractor = FeatureExtractor::new(config.clone()).unwrap();
            let features = extractor
                .extract(synthetic_epoch(channels, 128).view(), channels)
                .unwrap();
            let schema = FeatureSchema::generate(channels, &config.bands);
            prop_assert_eq!(features.names(), schema.columns());
        }
    }
}
