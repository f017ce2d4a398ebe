//! Raw Recording Input

use eeg_core::{EegError, PipelineConfig};
use ndarray::{s, Array2, Array3, Axis};

/// Sample matrix of a recording
#[derive(Debug, Clone)]
pub enum RecordingData {
    /// One continuous session, `channels × samples`
    Continuous(Array2<f64>),
    /// `trials × channels × samples` with one rating per trial
    Trials {
        trials: Array3<f64>,
        ratings: Vec<f64>,
    },
}

/// One subject/session's multichannel time series
#[derive(Debug, Clone)]
pub struct Recording {
    /// Recording identifier (file stem, subject id)
    pub id: String,
    /// Dataset origin tag
    pub dataset: String,
    /// Sampling rate the samples were acquired at (Hz)
    pub sampling_rate: f64,
    pub data: RecordingData,
}

impl Recording {
    /// Create a continuous recording
    pub fn continuous(id: &str, dataset: &str, sampling_rate: f64, data: Array2<f64>) -> Self {
        Self {
            id: id.to_string(),
            dataset: dataset.to_string(),
            sampling_rate,
            data: RecordingData::Continuous(data),
        }
    }

    /// Create a trial-structured recording
    pub fn trials(
        id: &str,
        dataset: &str,
        sampling_rate: f64,
        trials: Array3<f64>,
        ratings: Vec<f64>,
    ) -> Self {
        Self {
            id: id.to_string(),
            dataset: dataset.to_string(),
            sampling_rate,
            data: RecordingData::Trials { trials, ratings },
        }
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        match &self.data {
            RecordingData::Continuous(data) => data.nrows(),
            RecordingData::Trials { trials, .. } => trials.len_of(Axis(1)),
        }
    }

    /// Samples per channel (per trial for trial-structured recordings)
    pub fn sample_count(&self) -> usize {
        match &self.data {
            RecordingData::Continuous(data) => data.ncols(),
            RecordingData::Trials { trials, .. } => trials.len_of(Axis(2)),
        }
    }

    /// Check the recording against the frozen configuration
    pub fn validate(&self, config: &PipelineConfig) -> Result<(), EegError> {
        if (self.sampling_rate - config.sampling_rate).abs() > 1e-9 {
            return Err(EegError::InvalidShape(format!(
                "{}: sampling rate {} Hz, expected {} Hz",
                self.id, self.sampling_rate, config.sampling_rate
            )));
        }

        if self.channel_count() != config.expected_channels {
            return Err(EegError::InvalidShape(format!(
                "{}: {} channels, expected {}",
                self.id,
                self.channel_count(),
                config.expected_channels
            )));
        }

        if let RecordingData::Trials { trials, ratings } = &self.data {
            let n_trials = trials.len_of(Axis(0));
            if ratings.len() != n_trials {
                return Err(EegError::InvalidShape(format!(
                    "{}: {} ratings for {} trials",
                    self.id,
                    ratings.len(),
                    n_trials
                )));
            }
            if let Some(idx) = ratings.iter().position(|r| !r.is_finite()) {
                return Err(EegError::InvalidShape(format!(
                    "{}: rating for trial {} is not finite",
                    self.id, idx
                )));
            }
        }

        Ok(())
    }

    /// Keep only the first `n` channels (e.g. the EEG block of a device that
    /// also records peripheral signals). Never applied implicitly.
    pub fn select_leading_channels(self, n: usize) -> Result<Self, EegError> {
        if self.channel_count() < n {
            return Err(EegError::InvalidShape(format!(
                "{}: {} channels, cannot select {}",
                self.id,
                self.channel_count(),
                n
            )));
        }

        let data = match self.data {
            RecordingData::Continuous(data) => {
                RecordingData::Continuous(data.slice(s![..n, ..]).to_owned())
            }
            RecordingData::Trials { trials, ratings } => RecordingData::Trials {
                trials: trials.slice(s![.., ..n, ..]).to_owned(),
                ratings,
            },
        };

        Ok(Self { data, ..self })
    }
}
