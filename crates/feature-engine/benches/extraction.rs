//! Benchmarks for per-epoch feature extraction

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use eeg_core::PipelineConfig;
use feature_engine::{FeatureExtractor, Preprocessor, WelchEstimator};
use ndarray::Array2;
use std::sync::Arc;

/// Synthetic EEG: alpha tone plus pseudo-noise, scaled to ~50 µV
fn generate_channel(n: usize, freq_hz: f64, sample_rate: f64) -> Vec<f64> {
    use std::f64::consts::PI;

    (0..n)
        .map(|i| {
            let t = i as f64 / sample_rate;
            let signal = (2.0 * PI * freq_hz * t).sin();
            let noise = (i as f64 * 0.123).sin() * 0.1;
            (signal + noise) * 50.0
        })
        .collect()
}

fn bench_preprocessor(c: &mut Criterion) {
    let mut group = c.benchmark_group("bandpass_filtfilt");
    let config = PipelineConfig::default();
    let preprocessor = Preprocessor::from_config(&config).unwrap();

    for size in [640, 1280, 7680].iter() {
        let samples = generate_channel(*size, 10.0, 128.0);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(preprocessor.apply(black_box(&samples))));
        });
    }

    group.finish();
}

fn bench_welch(c: &mut Criterion) {
    let mut group = c.benchmark_group("welch_psd");

    for size in [256, 640, 1280].iter() {
        let samples = generate_channel(*size, 10.0, 128.0);
        let mut estimator = WelchEstimator::new(128.0, 256);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(estimator.psd(black_box(&samples))));
        });
    }

    group.finish();
}

fn bench_epoch_extraction(c: &mut Criterion) {
    let config = Arc::new(PipelineConfig::default());
    let mut extractor = FeatureExtractor::new(config.clone()).unwrap();
    let channels = config.expected_channels;
    let samples = config.epoch_samples();

    let mut epoch = Array2::<f64>::zeros((channels, samples));
    for (ch, mut row) in epoch.rows_mut().into_iter().enumerate() {
        let data = generate_channel(samples, 4.0 + ch as f64, 128.0);
        row.iter_mut().zip(data).for_each(|(dst, src)| *dst = src);
    }

    c.bench_function("epoch_14x640", |b| {
        b.iter(|| black_box(extractor.extract(black_box(epoch.view()), channels).unwrap()))
    });
}

criterion_group!(benches, bench_preprocessor, bench_welch, bench_epoch_extraction);
criterion_main!(benches);
