//! Fixed-length Windowing

use crate::policy::{map_score, segment_bounds, LabelPolicy};
use crate::recording::{Recording, RecordingData};
use eeg_core::{EegError, MentalState, PipelineConfig};
use ndarray::{s, ArrayView2, Axis};
use std::sync::Arc;
use tracing::debug;

/// One labeled window borrowed from its recording
#[derive(Debug, Clone)]
pub struct LabeledEpoch<'a> {
    /// `channels × window` samples
    pub data: ArrayView2<'a, f64>,
    pub label: MentalState,
    /// Originating recording (or recording + trial)
    pub group_id: String,
}

/// Number of complete windows of length `window` in `n` samples
pub fn window_count(n: usize, window: usize) -> usize {
    if window == 0 {
        0
    } else {
        n / window
    }
}

/// Start offsets of the complete windows; the partial tail is dropped
pub fn window_starts(n: usize, window: usize) -> impl Iterator<Item = usize> {
    (0..window_count(n, window)).map(move |k| k * window)
}

/// Slices recordings into labeled windows
pub struct Segmenter {
    config: Arc<PipelineConfig>,
    window: usize,
}

impl Segmenter {
    /// Create a new segmenter
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        let window = config.epoch_samples();
        Self { config, window }
    }

    /// Validate the recording and cut it into labeled windows in
    /// chronological (trial, then time) order.
    pub fn segment<'a>(&self, recording: &'a Recording) -> Result<Vec<LabeledEpoch<'a>>, EegError> {
        recording.validate(&self.config)?;

        let policy = LabelPolicy::for_recording(recording);
        debug!("{}: {:?} policy, window {} samples", recording.id, policy, self.window);

        let mut epochs = Vec::new();
        match &recording.data {
            RecordingData::Continuous(data) => {
                for span in segment_bounds(data.ncols(), &self.config) {
                    let segment = data.slice(s![.., span.samples.clone()]);
                    let before = epochs.len();
                    self.push_windows(segment, span.label, &recording.id, &mut epochs);
                    debug!(
                        "{}: {} samples {:?} -> {} windows",
                        recording.id,
                        span.label,
                        span.samples,
                        epochs.len() - before
                    );
                }
            }
            RecordingData::Trials { trials, ratings } => {
                for (idx, (trial, &score)) in trials.axis_iter(Axis(0)).zip(ratings).enumerate() {
                    let label = map_score(score, &self.config.labeling);
                    let group_id = format!("{}_t{}", recording.id, idx);
                    self.push_windows(trial, label, &group_id, &mut epochs);
                }
            }
        }

        if epochs.is_empty() {
            return Err(EegError::EmptyResult {
                recording: recording.id.clone(),
            });
        }

        Ok(epochs)
    }

    fn push_windows<'a>(
        &self,
        signal: ArrayView2<'a, f64>,
        label: MentalState,
        group_id: &str,
        out: &mut Vec<LabeledEpoch<'a>>,
    ) {
        for start in window_starts(signal.ncols(), self.window) {
            out.push(LabeledEpoch {
                data: signal.slice_move(s![.., start..start + self.window]),
                label,
                group_id: group_id.to_string(),
            });
        }
    }
}
