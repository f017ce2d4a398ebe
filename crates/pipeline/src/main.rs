//! EEG Mental-State Pipeline - Main Entry Point
//!
//! `eeg-pipeline extract <dir>...` converts recording documents into feature
//! rows; `eeg-pipeline train` (the default) runs the configured experiments.
//! `EEG_CONFIG` may point at a TOML file layered over the defaults.

use eeg_core::{EegError, PipelineConfig};
use pipeline::{init_logging, recordings_in_dirs, ExtractionPipeline};
use std::path::PathBuf;
use std::sync::Arc;
use storage::{FeatureStore, SqliteFeatureStore};
use tracing::{info, warn};
use training_engine::TrainingEngine;

async fn extract(
    config: Arc<PipelineConfig>,
    store: Arc<SqliteFeatureStore>,
    dirs: &[String],
) -> Result<(), EegError> {
    let pipeline = ExtractionPipeline::new(config, store)?;
    pipeline.prepare().await?;

    let recordings = recordings_in_dirs(dirs)?;
    info!("Extracting recordings from {}", dirs.join(", "));
    pipeline.run(recordings).await?;
    Ok(())
}

async fn train(
    config: Arc<PipelineConfig>,
    store: Arc<SqliteFeatureStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = TrainingEngine::new(config.clone());
    let mut reports = Vec::new();

    for experiment in &config.experiments {
        if let Some(report) = engine.run_experiment(store.as_ref(), experiment).await? {
            reports.push(report);
        }
    }

    info!("=== Summary ===");
    for report in &reports {
        info!(
            "{:<28} accuracy={:.3} macro_f1={:.3} ({} samples, {} groups)",
            report.name, report.mean_accuracy, report.mean_macro_f1, report.n_samples, report.n_groups
        );
    }
    if reports.is_empty() {
        warn!("No experiment had enough data to evaluate");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging()?;

    info!("=== EEG Mental-State Pipeline v{} ===", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var_os("EEG_CONFIG").map(PathBuf::from);
    let config = Arc::new(PipelineConfig::load(config_path.as_deref())?);
    let store = Arc::new(SqliteFeatureStore::connect(&config.storage.database_url).await?);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result: Result<(), Box<dyn std::error::Error>> = match args.first().map(String::as_str) {
        Some("extract") if args.len() > 1 => extract(config, store.clone(), &args[1..])
            .await
            .map_err(Into::into),
        Some("extract") => Err("usage: eeg-pipeline extract <dir>...".into()),
        Some("train") | None => train(config, store.clone()).await,
        Some(other) => Err(format!("unknown command: {}", other).into()),
    };

    if let Some(schema) = store.schema().await? {
        info!("Feature store holds schema v{} with {} columns", schema.version(), schema.len());
    }
    store.close().await;
    result
}
