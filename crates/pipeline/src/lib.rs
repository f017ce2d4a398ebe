//! EEG Mental-State Pipeline
//!
//! Wires the segmenter, feature builder and feature store into a
//! per-recording extraction run, and exposes logging setup for the binary.

mod extraction;
mod loader;

pub use extraction::{ExtractionPipeline, RunSummary};
pub use loader::{load_recording, recordings_in_dir, recordings_in_dirs, RecordingFile};

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
