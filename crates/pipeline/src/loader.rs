//! JSON Recording Interchange
//!
//! Vendor formats are converted upstream into one JSON document per
//! recording; this module turns those documents into [`Recording`]s.

use eeg_core::EegError;
use epoch_segmenter::Recording;
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// On-disk recording document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingFile {
    pub id: String,
    pub dataset: String,
    pub sampling_rate: f64,
    /// Continuous recording, `channels × samples`
    #[serde(default)]
    pub channels: Option<Vec<Vec<f64>>>,
    /// Trial recording, `trials × channels × samples`
    #[serde(default)]
    pub trials: Option<Vec<Vec<Vec<f64>>>>,
    /// One rating per trial
    #[serde(default)]
    pub ratings: Option<Vec<f64>>,
    /// Keep only this many leading channels (devices with extra signals)
    #[serde(default)]
    pub leading_channels: Option<usize>,
}

fn shape_error(id: &str, msg: impl std::fmt::Display) -> EegError {
    EegError::InvalidShape(format!("{}: {}", id, msg))
}

fn to_matrix(id: &str, rows: Vec<Vec<f64>>) -> Result<Array2<f64>, EegError> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != n_cols) {
        return Err(shape_error(id, "channels have different sample counts"));
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n_rows, n_cols), flat).map_err(|e| shape_error(id, e))
}

fn to_tensor(id: &str, trials: Vec<Vec<Vec<f64>>>) -> Result<Array3<f64>, EegError> {
    let n_trials = trials.len();
    let n_channels = trials.first().map_or(0, Vec::len);
    let n_samples = trials
        .first()
        .and_then(|t| t.first())
        .map_or(0, Vec::len);

    let ragged = trials
        .iter()
        .any(|t| t.len() != n_channels || t.iter().any(|c| c.len() != n_samples));
    if ragged {
        return Err(shape_error(id, "trials are not rectangular"));
    }

    let flat: Vec<f64> = trials.into_iter().flatten().flatten().collect();
    Array3::from_shape_vec((n_trials, n_channels, n_samples), flat).map_err(|e| shape_error(id, e))
}

impl RecordingFile {
    /// Convert into a [`Recording`]; exactly one of `channels` or `trials`
    /// must be present, and `trials` requires `ratings`.
    pub fn into_recording(self) -> Result<Recording, EegError> {
        let id = self.id;
        let recording = match (self.channels, self.trials, self.ratings) {
            (Some(channels), None, None) => Recording::continuous(
                &id,
                &self.dataset,
                self.sampling_rate,
                to_matrix(&id, channels)?,
            ),
            (None, Some(trials), Some(ratings)) => Recording::trials(
                &id,
                &self.dataset,
                self.sampling_rate,
                to_tensor(&id, trials)?,
                ratings,
            ),
            (None, Some(_), None) => return Err(shape_error(&id, "trials without ratings")),
            _ => {
                return Err(shape_error(
                    &id,
                    "expected either `channels` or `trials` with `ratings`",
                ))
            }
        };

        match self.leading_channels {
            Some(n) => recording.select_leading_channels(n),
            None => Ok(recording),
        }
    }
}

/// Read one recording document. Unreadable or malformed files are
/// `InvalidShape`, so a run skips them.
pub fn load_recording(path: &Path) -> Result<Recording, EegError> {
    let name = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|e| shape_error(&name, e))?;
    let file: RecordingFile = serde_json::from_str(&text).map_err(|e| shape_error(&name, e))?;
    debug!("Loaded {} from {}", file.id, name);
    file.into_recording()
}

/// Every `*.json` file in `dir`, in file-name order, loaded lazily
pub fn recordings_in_dir(
    dir: &Path,
) -> Result<impl Iterator<Item = Result<Recording, EegError>>, EegError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        EegError::InvalidParameter(format!("cannot read directory {}: {}", dir.display(), e))
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
        .collect();
    paths.sort();

    Ok(paths.into_iter().map(|p| load_recording(&p)))
}

/// Recordings of several directories as one stream, in argument order.
///
/// Every directory is listed before anything is loaded, so a missing one
/// fails the call instead of cutting a run short.
pub fn recordings_in_dirs<P: AsRef<Path>>(
    dirs: &[P],
) -> Result<impl Iterator<Item = Result<Recording, EegError>>, EegError> {
    let listings = dirs
        .iter()
        .map(|dir| recordings_in_dir(dir.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(listings.into_iter().flatten())
}
