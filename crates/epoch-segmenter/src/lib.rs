//! Epoch Segmenter
//!
//! Validates raw recordings against the frozen configuration, then slices
//! them into fixed-length, non-overlapping windows with a label and a group id
//! under the label policy that matches the recording's shape.

mod policy;
mod recording;
mod segmenter;

pub use policy::{map_score, segment_bounds, LabelPolicy, LabeledSpan};
pub use recording::{Recording, RecordingData};
pub use segmenter::{window_count, window_starts, LabeledEpoch, Segmenter};
