//! Pipeline configuration
//!
//! One immutable [`PipelineConfig`] is built at startup and shared (behind an
//! `Arc`) with every component constructor. Defaults are the frozen values
//! the feature tables were built with; a TOML file and `EEG__*` environment
//! variables may override them before [`PipelineConfig::validate`] runs.

use crate::band::{canonical_bands, Band};
use crate::{EegError, DATASET_DEAP, DATASET_EMOTIV};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Band-pass preprocessing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Low cutoff (Hz)
    pub low_hz: f64,
    /// High cutoff (Hz)
    pub high_hz: f64,
    /// Butterworth prototype order
    pub order: usize,
    /// Signals of this length or shorter are returned unfiltered
    pub min_samples: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            low_hz: 0.5,
            high_hz: 40.0,
            order: 4,
            min_samples: 256,
        }
    }
}

/// Welch estimator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralConfig {
    /// Upper bound on the Welch segment length (samples)
    pub max_segment_len: usize,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self { max_segment_len: 256 }
    }
}

/// Label policy parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelingConfig {
    /// End of the Focused segment in continuous recordings (seconds)
    pub focused_until_secs: f64,
    /// End of the Unfocused segment in continuous recordings (seconds)
    pub unfocused_until_secs: f64,
    /// Ratings strictly above this map to Focused
    pub high_threshold: f64,
    /// Ratings strictly below this map to Drowsy
    pub low_threshold: f64,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            focused_until_secs: 600.0,
            unfocused_until_secs: 1200.0,
            high_threshold: 5.0,
            low_threshold: 3.0,
        }
    }
}

/// Grouped evaluation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Requested number of folds (reduced when there are fewer groups)
    pub n_folds: usize,
    /// Trees per forest
    pub n_trees: usize,
    /// Maximum tree depth (unbounded if None)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples in each leaf
    pub min_samples_leaf: usize,
    /// Base random seed
    pub seed: u64,
    /// Prefix that identifies feature columns in the store
    pub feature_prefix: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_folds: 5,
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
            feature_prefix: "channel".to_string(),
        }
    }
}

/// Feature store location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// sqlx connection URL
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://eeg_features.db?mode=rwc".to_string(),
        }
    }
}

/// One named training run over a dataset selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Display name
    pub name: String,
    /// Dataset tags to load
    pub datasets: Vec<String>,
}

impl ExperimentConfig {
    /// Create a new experiment over the given datasets
    pub fn new(name: &str, datasets: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            datasets: datasets.iter().map(|d| d.to_string()).collect(),
        }
    }
}

/// Frozen configuration for the whole pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Sampling rate every recording must match (Hz)
    pub sampling_rate: f64,
    /// Window length (seconds)
    pub epoch_seconds: f64,
    /// Channel count every recording must match
    pub expected_channels: usize,
    /// Bands in feature-column order
    pub bands: Vec<Band>,
    pub filter: FilterConfig,
    pub spectral: SpectralConfig,
    pub labeling: LabelingConfig,
    pub training: TrainingConfig,
    pub storage: StorageConfig,
    /// Experiments run by the binary, in order
    pub experiments: Vec<ExperimentConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 128.0,
            epoch_seconds: 5.0,
            expected_channels: 14,
            bands: canonical_bands(),
            filter: FilterConfig::default(),
            spectral: SpectralConfig::default(),
            labeling: LabelingConfig::default(),
            training: TrainingConfig::default(),
            storage: StorageConfig::default(),
            experiments: vec![
                ExperimentConfig::new("Baseline (EMOTIV)", &[DATASET_EMOTIV]),
                ExperimentConfig::new("Validation (DEAP)", &[DATASET_DEAP]),
                ExperimentConfig::new("Generalized (Combined)", &[DATASET_EMOTIV, DATASET_DEAP]),
            ],
        }
    }
}

impl PipelineConfig {
    /// Load defaults, then an optional TOML file, then `EEG__*` environment
    /// overrides (e.g. `EEG__TRAINING__N_FOLDS=3`), and validate the result.
    pub fn load(path: Option<&Path>) -> Result<Self, EegError> {
        let defaults = config::Config::try_from(&PipelineConfig::default())?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            info!("Loading pipeline config from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let cfg: PipelineConfig = builder
            .add_source(
                config::Environment::with_prefix("EEG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Nyquist frequency (Hz)
    pub fn nyquist(&self) -> f64 {
        self.sampling_rate / 2.0
    }

    /// Samples per window
    pub fn epoch_samples(&self) -> usize {
        self.seconds_to_samples(self.epoch_seconds)
    }

    /// Convert a duration to a whole number of samples
    pub fn seconds_to_samples(&self, seconds: f64) -> usize {
        (seconds * self.sampling_rate).round() as usize
    }

    /// Check every invariant the components rely on
    pub fn validate(&self) -> Result<(), EegError> {
        let invalid = |msg: String| Err(EegError::InvalidParameter(msg));

        if !(self.sampling_rate.is_finite() && self.sampling_rate > 0.0) {
            return invalid(format!("sampling rate must be positive, got {}", self.sampling_rate));
        }
        if !(self.epoch_seconds.is_finite() && self.epoch_seconds > 0.0) || self.epoch_samples() == 0 {
            return invalid(format!("epoch length {}s yields no samples", self.epoch_seconds));
        }
        if self.expected_channels == 0 {
            return invalid("expected channel count must be at least 1".to_string());
        }

        if self.bands.is_empty() {
            return invalid("at least one band is required".to_string());
        }
        let mut names = HashSet::new();
        for band in &self.bands {
            band.validate()?;
            if !names.insert(band.name.as_str()) {
                return invalid(format!("duplicate band name {}", band.name));
            }
        }

        let f = &self.filter;
        if !(f.low_hz > 0.0 && f.low_hz < f.high_hz && f.high_hz < self.nyquist()) {
            return invalid(format!(
                "filter passband requires 0 < low < high < {} Hz, got [{}, {}]",
                self.nyquist(),
                f.low_hz,
                f.high_hz
            ));
        }
        if f.order == 0 {
            return invalid("filter order must be at least 1".to_string());
        }
        let pad = 3 * (2 * f.order + 1);
        if f.min_samples < pad {
            return invalid(format!(
                "filter min_samples {} is shorter than the {}-sample edge padding",
                f.min_samples, pad
            ));
        }

        if self.spectral.max_segment_len == 0 {
            return invalid("spectral segment length must be at least 1".to_string());
        }

        let l = &self.labeling;
        if !(l.focused_until_secs >= 0.0 && l.focused_until_secs <= l.unfocused_until_secs) {
            return invalid(format!(
                "time segments require 0 <= focused_until <= unfocused_until, got {} / {}",
                l.focused_until_secs, l.unfocused_until_secs
            ));
        }
        if !(l.low_threshold.is_finite() && l.high_threshold.is_finite())
            || l.low_threshold > l.high_threshold
        {
            return invalid(format!(
                "score thresholds require low <= high, got {} / {}",
                l.low_threshold, l.high_threshold
            ));
        }

        let t = &self.training;
        if t.n_folds < 2 {
            return invalid(format!("at least 2 folds are required, got {}", t.n_folds));
        }
        if t.n_trees == 0 {
            return invalid("forest needs at least one tree".to_string());
        }
        if t.min_samples_split < 2 || t.min_samples_leaf == 0 {
            return invalid("min_samples_split must be >= 2 and min_samples_leaf >= 1".to_string());
        }
        if t.feature_prefix.is_empty() {
            return invalid("feature prefix must not be empty".to_string());
        }

        for experiment in &self.experiments {
            if experiment.datasets.is_empty() {
                return invalid(format!("experiment {} selects no datasets", experiment.name));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = PipelineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.epoch_samples(), 640);
        assert_eq!(cfg.nyquist(), 64.0);
        assert_eq!(cfg.seconds_to_samples(600.0), 76_800);
        assert_eq!(cfg.experiments.len(), 3);
    }

    #[test]
    fn test_passband_above_nyquist_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.filter.high_hz = 64.0;
        assert!(matches!(cfg.validate(), Err(EegError::InvalidParameter(_))));
    }

    #[test]
    fn test_zero_low_cutoff_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.filter.low_hz = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.labeling.low_threshold = 6.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_duplicate_band_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.bands.push(Band::new("alpha", 8.0, 12.0));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_single_fold_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.training.n_folds = 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let cfg = PipelineConfig::load(None).unwrap();
        assert_eq!(cfg.sampling_rate, 128.0);
        assert_eq!(cfg.bands, canonical_bands());
        assert_eq!(cfg.training.seed, 42);
    }

    #[test]
    fn test_load_file_overrides() {
        let path = std::env::temp_dir().join(format!("eeg-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "epoch_seconds = 2.0").unwrap();
        writeln!(file, "[training]").unwrap();
        writeln!(file, "n_folds = 3").unwrap();
        drop(file);

        let cfg = PipelineConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(cfg.epoch_samples(), 256);
        assert_eq!(cfg.training.n_folds, 3);
        assert_eq!(cfg.training.n_trees, 100);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!("eeg-bad-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[filter]\nhigh_hz = 80.0\n").unwrap();

        let result = PipelineConfig::load(Some(&path));
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(EegError::InvalidParameter(_))));
    }
}
