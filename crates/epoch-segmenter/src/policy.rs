//! Dataset Label Policies

use crate::recording::{Recording, RecordingData};
use eeg_core::{LabelingConfig, MentalState, PipelineConfig};
use std::ops::Range;

/// How windows of a recording receive their label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPolicy {
    /// Continuous session split into Focused / Unfocused / Drowsy time spans
    TimeSegmented,
    /// Each trial labeled from its self-reported rating
    ScoreThresholded,
}

impl LabelPolicy {
    /// Select the policy from the recording's shape
    pub fn for_recording(recording: &Recording) -> Self {
        match recording.data {
            RecordingData::Continuous(_) => LabelPolicy::TimeSegmented,
            RecordingData::Trials { .. } => LabelPolicy::ScoreThresholded,
        }
    }
}

/// Sample range of a continuous recording sharing one label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSpan {
    pub label: MentalState,
    pub samples: Range<usize>,
}

/// Map a rating to a label. Comparisons are strict on both thresholds.
pub fn map_score(score: f64, labeling: &LabelingConfig) -> MentalState {
    if score > labeling.high_threshold {
        MentalState::Focused
    } else if score < labeling.low_threshold {
        MentalState::Drowsy
    } else {
        MentalState::Unfocused
    }
}

/// Split `n_samples` into the three half-open time spans, each boundary
/// clipped to the recording length. Spans may be empty.
pub fn segment_bounds(n_samples: usize, config: &PipelineConfig) -> [LabeledSpan; 3] {
    let focused_end = config
        .seconds_to_samples(config.labeling.focused_until_secs)
        .min(n_samples);
    let unfocused_end = config
        .seconds_to_samples(config.labeling.unfocused_until_secs)
        .min(n_samples)
        .max(focused_end);

    [
        LabeledSpan {
            label: MentalState::Focused,
            samples: 0..focused_end,
        },
        LabeledSpan {
            label: MentalState::Unfocused,
            samples: focused_end..unfocused_end,
        },
        LabeledSpan {
            label: MentalState::Drowsy,
            samples: unfocused_end..n_samples,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    #[test]
    fn test_score_thresholds() {
        let labeling = LabelingConfig::default();
        assert_eq!(map_score(6.0, &labeling), MentalState::Focused);
        assert_eq!(map_score(2.0, &labeling), MentalState::Drowsy);
        assert_eq!(map_score(5.0, &labeling), MentalState::Unfocused);
        assert_eq!(map_score(3.0, &labeling), MentalState::Unfocused);
        assert_eq!(map_score(5.01, &labeling), MentalState::Focused);
        assert_eq!(map_score(2.99, &labeling), MentalState::Drowsy);
    }

    #[test]
    fn test_bounds_25_minutes() {
        let config = PipelineConfig::default();
        let n = 25 * 60 * 128;
        let spans = segment_bounds(n, &config);

        assert_eq!(spans[0].samples, 0..76_800);
        assert_eq!(spans[1].samples, 76_800..153_600);
        assert_eq!(spans[2].samples, 153_600..n);
        assert_eq!(spans[2].label, MentalState::Drowsy);
    }

    #[test]
    fn test_bounds_under_10_minutes() {
        let config = PipelineConfig::default();
        let n = 5 * 60 * 128;
        let spans = segment_bounds(n, &config);

        assert_eq!(spans[0].samples, 0..n);
        assert!(spans[1].samples.is_empty());
        assert!(spans[2].samples.is_empty());
    }

    #[test]
    fn test_bounds_between_10_and_20_minutes() {
        let config = PipelineConfig::default();
        let n = 15 * 60 * 128;
        let spans = segment_bounds(n, &config);

        assert_eq!(spans[1].samples, 76_800..n);
        assert!(spans[2].samples.is_empty());
    }

    #[test]
    fn test_policy_dispatch() {
        let continuous = Recording::continuous("a", "EMOTIV", 128.0, Array2::zeros((14, 10)));
        let trials = Recording::trials("b", "DEAP", 128.0, Array3::zeros((1, 14, 10)), vec![5.0]);

        assert_eq!(LabelPolicy::for_recording(&continuous), LabelPolicy::TimeSegmented);
        assert_eq!(LabelPolicy::for_recording(&trials), LabelPolicy::ScoreThresholded);
    }
}
