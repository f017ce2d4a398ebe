//! Per-recording Extraction Run

use eeg_core::{EegError, PipelineConfig};
use epoch_segmenter::{Recording, Segmenter};
use feature_engine::{FeatureExtractor, FeatureSchema};
use std::sync::{Arc, Mutex};
use storage::{FeatureRow, FeatureStore};
use tracing::{info, warn};

/// Totals of one extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Recordings whose batch was committed
    pub processed: usize,
    /// Recordings skipped after a recoverable error
    pub skipped: usize,
    /// Windows cut from processed recordings
    pub windows: usize,
    /// Rows committed to the store
    pub rows_written: u64,
}

impl RunSummary {
    fn log(&self) {
        info!(
            "Run summary: {} recordings processed, {} skipped, {} windows, {} rows written",
            self.processed, self.skipped, self.windows, self.rows_written
        );
    }
}

/// Turns recordings into feature rows, one committed batch per recording
pub struct ExtractionPipeline {
    config: Arc<PipelineConfig>,
    schema: Arc<FeatureSchema>,
    segmenter: Arc<Segmenter>,
    extractor: Arc<Mutex<FeatureExtractor>>,
    store: Arc<dyn FeatureStore>,
}

impl ExtractionPipeline {
    /// Create a new pipeline. The band-pass filter is designed here, so a
    /// malformed passband fails before any recording is read.
    pub fn new(config: Arc<PipelineConfig>, store: Arc<dyn FeatureStore>) -> Result<Self, EegError> {
        Ok(Self {
            schema: Arc::new(FeatureSchema::from_config(&config)),
            segmenter: Arc::new(Segmenter::new(config.clone())),
            extractor: Arc::new(Mutex::new(FeatureExtractor::new(config.clone())?)),
            config,
            store,
        })
    }

    /// Column layout every row is aligned to
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Create the store table, or check it against the persisted schema
    pub async fn prepare(&self) -> Result<(), EegError> {
        self.store.ensure_schema(&self.schema).await?;
        Ok(())
    }

    /// Process recordings one after another.
    ///
    /// Recoverable errors skip the recording; parameter errors abort the run.
    /// The summary is logged either way.
    pub async fn run<I>(&self, recordings: I) -> Result<RunSummary, EegError>
    where
        I: IntoIterator<Item = Result<Recording, EegError>>,
    {
        let mut summary = RunSummary::default();
        let outcome = self.run_all(recordings, &mut summary).await;
        summary.log();
        outcome.map(|_| summary)
    }

    async fn run_all<I>(&self, recordings: I, summary: &mut RunSummary) -> Result<(), EegError>
    where
        I: IntoIterator<Item = Result<Recording, EegError>>,
    {
        for item in recordings {
            let result = match item {
                Ok(recording) => {
                    let id = recording.id.clone();
                    self.process(recording).await.map_err(|e| (id, e))
                }
                Err(e) => Err(("<unreadable>".to_string(), e)),
            };

            match result {
                Ok((windows, rows)) => {
                    summary.processed += 1;
                    summary.windows += windows;
                    summary.rows_written += rows;
                    metrics::counter!("eeg_recordings_processed_total").increment(1);
                    metrics::counter!("eeg_rows_written_total").increment(rows);
                }
                Err((id, e)) if e.is_recoverable() => {
                    warn!("Skipping recording {}: {}", id, e);
                    summary.skipped += 1;
                    metrics::counter!("eeg_recordings_skipped_total").increment(1);
                }
                Err((id, e)) => {
                    warn!("Aborting run at recording {}: {}", id, e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Extract one recording off the async runtime, then commit its batch
    async fn process(&self, recording: Recording) -> Result<(usize, u64), EegError> {
        info!("Processing recording {} ({})", recording.id, recording.dataset);

        let config = self.config.clone();
        let schema = self.schema.clone();
        let segmenter = self.segmenter.clone();
        let extractor = self.extractor.clone();

        let rows = tokio::task::spawn_blocking(move || {
            extract_rows(&config, &schema, &segmenter, &extractor, &recording)
        })
        .await
        .map_err(|e| EegError::InvalidParameter(format!("extraction task failed: {}", e)))??;

        let windows = rows.len();
        let written = self.store.append_batch(&rows).await?;
        info!("Stored {} windows", windows);
        Ok((windows, written))
    }
}

fn extract_rows(
    config: &PipelineConfig,
    schema: &FeatureSchema,
    segmenter: &Segmenter,
    extractor: &Mutex<FeatureExtractor>,
    recording: &Recording,
) -> Result<Vec<FeatureRow>, EegError> {
    let epochs = segmenter.segment(recording)?;
    let mut extractor = extractor
        .lock()
        .map_err(|e| EegError::InvalidParameter(format!("feature extractor poisoned: {}", e)))?;

    epochs
        .into_iter()
        .map(|epoch| {
            let features = extractor.extract(epoch.data, config.expected_channels)?;
            Ok(FeatureRow {
                dataset_name: recording.dataset.clone(),
                group_id: epoch.group_id,
                label: epoch.label,
                values: schema.align(&features)?,
            })
        })
        .collect()
}
