//! Welch power spectral density and band power

use eeg_core::{Band, PipelineConfig};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::HashMap;
use std::sync::Arc;

/// One-sided power spectral density
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerSpectrum {
    /// Bin frequencies (Hz), ascending from 0
    pub freqs: Vec<f64>,
    /// Density per bin (units² / Hz)
    pub density: Vec<f64>,
}

impl PowerSpectrum {
    /// Trapezoidal integral of the density over bins with `low <= f <= high`.
    ///
    /// Fewer than two bins in range integrate to zero.
    pub fn band_power(&self, band: &Band) -> f64 {
        let bins: Vec<(f64, f64)> = self
            .freqs
            .iter()
            .zip(&self.density)
            .filter(|(f, _)| band.contains(**f))
            .map(|(&f, &p)| (f, p))
            .collect();

        bins.windows(2)
            .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
            .sum()
    }

    /// Integral over the whole spectrum
    #[cfg(test)]
    pub fn total_power(&self) -> f64 {
        self.freqs
            .windows(2)
            .zip(self.density.windows(2))
            .map(|(f, p)| (f[1] - f[0]) * (p[0] + p[1]) / 2.0)
            .sum()
    }

    /// Frequency of the strongest bin
    #[cfg(test)]
    pub fn dominant_frequency(&self) -> f64 {
        self.density
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| self.freqs[i])
            .unwrap_or(0.0)
    }
}

/// Welch estimator: Hann segments, 50% overlap, constant detrend, density scaling
pub struct WelchEstimator {
    /// Planned forward FFTs by segment length
    plans: HashMap<usize, Arc<dyn Fft<f64>>>,
    /// Sampling frequency (Hz)
    sample_rate: f64,
    /// Upper bound on segment length
    max_segment_len: usize,
}

impl WelchEstimator {
    /// Create a new estimator
    pub fn new(sample_rate: f64, max_segment_len: usize) -> Self {
        Self {
            plans: HashMap::new(),
            sample_rate,
            max_segment_len: max_segment_len.max(1),
        }
    }

    /// Create an estimator from the pipeline's spectral settings
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.sampling_rate, config.spectral.max_segment_len)
    }

    /// Periodic Hann window
    fn hann(len: usize) -> Vec<f64> {
        if len == 1 {
            return vec![1.0];
        }
        (0..len)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / len as f64).cos())
            .collect()
    }

    /// Estimate the one-sided PSD with segment length `min(max_segment_len, len)`
    pub fn psd(&mut self, signal: &[f64]) -> PowerSpectrum {
        if signal.is_empty() {
            return PowerSpectrum::default();
        }

        let n = signal.len();
        let seg_len = self.max_segment_len.min(n);
        let step = seg_len - seg_len / 2;
        let n_bins = seg_len / 2 + 1;

        let window = Self::hann(seg_len);
        let scale = 1.0 / (self.sample_rate * window.iter().map(|w| w * w).sum::<f64>());
        let fft = self
            .plans
            .entry(seg_len)
            .or_insert_with(|| FftPlanner::new().plan_fft_forward(seg_len))
            .clone();

        let mut accum = vec![0.0; n_bins];
        let mut segments = 0usize;
        let mut buffer: Vec<Complex<f64>> = Vec::with_capacity(seg_len);
        let mut start = 0;

        while start + seg_len <= n {
            let segment = &signal[start..start + seg_len];
            let mean = segment.iter().sum::<f64>() / seg_len as f64;

            buffer.clear();
            buffer.extend(
                segment
                    .iter()
                    .zip(&window)
                    .map(|(&v, &w)| Complex::new((v - mean) * w, 0.0)),
            );
            fft.process(&mut buffer);

            for (acc, c) in accum.iter_mut().zip(&buffer) {
                *acc += c.norm_sqr();
            }
            segments += 1;
            start += step;
        }

        // Double every bin except DC and, for even lengths, Nyquist
        let last_doubled = if seg_len % 2 == 0 { n_bins - 1 } else { n_bins };
        let density = accum
            .iter()
            .enumerate()
            .map(|(k, &p)| {
                let one_sided = if k > 0 && k < last_doubled { 2.0 } else { 1.0 };
                p * scale * one_sided / segments as f64
            })
            .collect();

        let freq_resolution = self.sample_rate / seg_len as f64;
        let freqs = (0..n_bins).map(|k| k as f64 * freq_resolution).collect();

        PowerSpectrum { freqs, density }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeg_core::canonical_bands;

    const FS: f64 = 128.0;

    fn sine(freq: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / FS).sin())
            .collect()
    }

    #[test]
    fn test_segment_length_is_capped() {
        let mut welch = WelchEstimator::new(FS, 256);
        let spectrum = welch.psd(&sine(10.0, 640));
        assert_eq!(spectrum.freqs.len(), 129);
        assert!((spectrum.freqs[1] - 0.5).abs() < 1e-12);
        assert!((spectrum.freqs[128] - 64.0).abs() < 1e-12);
    }

    #[test]
    fn test_short_signal_uses_full_length() {
        let mut welch = WelchEstimator::new(FS, 256);
        let spectrum = welch.psd(&sine(10.0, 64));
        assert_eq!(spectrum.freqs.len(), 33);
        assert!((spectrum.freqs[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_sine_power_lands_in_alpha() {
        let mut welch = WelchEstimator::new(FS, 256);
        let spectrum = welch.psd(&sine(10.0, 640));
        let bands = canonical_bands();

        let theta = spectrum.band_power(&bands[1]);
        let alpha = spectrum.band_power(&bands[2]);

        assert!((spectrum.dominant_frequency() - 10.0).abs() < 1e-9);
        assert!((alpha - 0.5).abs() < 0.01, "alpha power {}", alpha);
        assert!(alpha > 100.0 * theta);
    }

    #[test]
    fn test_total_power_matches_variance() {
        let mut welch = WelchEstimator::new(FS, 256);
        let amplitude = 3.0;
        let signal: Vec<f64> = sine(12.0, 640).iter().map(|v| v * amplitude).collect();
        let total = welch.psd(&signal).total_power();
        assert!((total - amplitude * amplitude / 2.0).abs() < 0.05, "total {}", total);
    }

    #[test]
    fn test_band_outside_range_is_zero() {
        let mut welch = WelchEstimator::new(FS, 256);
        let signal = sine(10.0, 640);
        assert_eq!(welch.psd(&signal).band_power(&Band::new("high", 70.0, 90.0)), 0.0);
    }

    #[test]
    fn test_band_narrower_than_resolution_is_zero() {
        // 8-sample segments give 16 Hz bins, so nothing lands in 4..8 Hz
        let mut welch = WelchEstimator::new(FS, 256);
        let signal = sine(6.0, 8);
        assert_eq!(welch.psd(&signal).band_power(&Band::new("theta", 4.0, 8.0)), 0.0);
    }

    #[test]
    fn test_empty_signal() {
        let mut welch = WelchEstimator::new(FS, 256);
        let spectrum = welch.psd(&[]);
        assert!(spectrum.freqs.is_empty());
        assert_eq!(spectrum.band_power(&Band::new("alpha", 8.0, 13.0)), 0.0);
    }

    #[test]
    fn test_constant_signal_has_no_power() {
        let mut welch = WelchEstimator::new(FS, 256);
        let spectrum = welch.psd(&vec![4.2; 512]);
        assert!(spectrum.total_power().abs() < 1e-20);
    }
}
