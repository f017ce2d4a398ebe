//! Zero-phase Butterworth band-pass filtering
//!
//! The band-pass is designed as an analog Butterworth prototype, shifted to a
//! band-pass and mapped through the bilinear transform, then run as a cascade
//! of second-order sections. [`Preprocessor::apply`] filters forward and
//! backward with odd-extended edges and steady-state initial conditions, so the
//! output has no phase shift.

use eeg_core::{EegError, PipelineConfig};
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;

/// Second-order section coefficients
#[derive(Clone, Debug, PartialEq)]
pub struct BiquadCoeffs {
    /// Numerator coefficients [b0, b1, b2]
    pub b: [f64; 3],
    /// Denominator coefficients [a0=1, a1, a2]
    pub a: [f64; 3],
}

impl BiquadCoeffs {
    /// Steady-state state vector for a unit step input
    fn step_state(&self) -> [f64; 2] {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        let r1 = b1 - a1 * b0;
        let r2 = b2 - a2 * b0;
        let z0 = (r1 + r2) / (1.0 + a1 + a2);
        [z0, r2 - a2 * z0]
    }

    /// DC gain of the section
    fn dc_gain(&self) -> f64 {
        self.b.iter().sum::<f64>() / self.a.iter().sum::<f64>()
    }
}

/// Butterworth band-pass as a cascade of biquads
#[derive(Clone, Debug)]
pub struct ButterworthBandpass {
    sections: Vec<BiquadCoeffs>,
    /// Per-section initial state for a unit-amplitude input
    zi: Vec<[f64; 2]>,
}

impl ButterworthBandpass {
    /// Design a band-pass of the given prototype order.
    ///
    /// The resulting filter has `2 * order` poles. Cutoffs must satisfy
    /// `0 < low_hz < high_hz < sample_rate / 2`.
    pub fn design(sample_rate: f64, low_hz: f64, high_hz: f64, order: usize) -> Result<Self, EegError> {
        let nyquist = sample_rate / 2.0;
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(EegError::InvalidParameter(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        if !(low_hz > 0.0 && low_hz < high_hz && high_hz < nyquist) {
            return Err(EegError::InvalidParameter(format!(
                "band-pass requires 0 < low < high < {} Hz, got [{}, {}]",
                nyquist, low_hz, high_hz
            )));
        }
        if order == 0 {
            return Err(EegError::InvalidParameter("filter order must be at least 1".to_string()));
        }

        // Pre-warp the normalized edges for the bilinear transform (design fs = 2)
        let fs2 = 4.0;
        let warp = |hz: f64| fs2 * (PI * (hz / nyquist) / 2.0).tan();
        let (w_low, w_high) = (warp(low_hz), warp(high_hz));
        let bw = w_high - w_low;
        let wo_sq = w_low * w_high;

        // Analog low-pass prototype poles on the left half of the unit circle
        let n = order as f64;
        let prototype = (0..order).map(|k| {
            let m = 2.0 * k as f64 - (n - 1.0);
            -Complex64::from_polar(1.0, PI * m / (2.0 * n))
        });

        // Low-pass to band-pass: every prototype pole becomes a pair
        let mut analog = Vec::with_capacity(2 * order);
        for p in prototype {
            let scaled = p * (bw / 2.0);
            let root = (scaled * scaled - wo_sq).sqrt();
            analog.push(scaled + root);
            analog.push(scaled - root);
        }

        // Bilinear transform; the order zeros at s = 0 land on z = 1, the rest on z = -1
        let fs2c = Complex64::new(fs2, 0.0);
        let digital: Vec<Complex64> = analog.iter().map(|&p| (fs2c + p) / (fs2c - p)).collect();
        let denom = analog
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, &p| acc * (fs2c - p));
        let gain = (bw * fs2).powi(order as i32) / denom.re;

        let mut sections = pair_poles(&digital)
            .into_iter()
            .map(|a| BiquadCoeffs { b: [1.0, 0.0, -1.0], a })
            .collect::<Vec<_>>();
        if let Some(first) = sections.first_mut() {
            for coeff in &mut first.b {
                *coeff *= gain;
            }
        }

        let mut zi = Vec::with_capacity(sections.len());
        let mut scale = 1.0;
        for section in &sections {
            let [z0, z1] = section.step_state();
            zi.push([z0 * scale, z1 * scale]);
            scale *= section.dc_gain();
        }

        Ok(Self { sections, zi })
    }

    /// Section coefficients
    pub fn sections(&self) -> &[BiquadCoeffs] {
        &self.sections
    }

    /// Odd-extension length used at each edge by [`ButterworthBandpass::filtfilt`]
    pub fn edge_len(&self) -> usize {
        3 * (2 * self.sections.len() + 1)
    }

    /// Run the cascade over `signal` in place, with initial states scaled to
    /// the steady-state response for a constant input of `x0`
    fn run(&self, signal: &mut [f64], x0: f64) {
        for (section, zi) in self.sections.iter().zip(&self.zi) {
            let [b0, b1, b2] = section.b;
            let [_, a1, a2] = section.a;
            let mut z = [zi[0] * x0, zi[1] * x0];
            for sample in signal.iter_mut() {
                let x = *sample;
                let y = b0 * x + z[0];
                z[0] = b1 * x - a1 * y + z[1];
                z[1] = b2 * x - a2 * y;
                *sample = y;
            }
        }
    }

    /// Forward-backward filtering. Signals no longer than the edge padding are
    /// returned unchanged.
    pub fn filtfilt(&self, signal: &[f64]) -> Vec<f64> {
        let edge = self.edge_len();
        let n = signal.len();
        if n <= edge {
            return signal.to_vec();
        }

        let first = signal[0];
        let last = signal[n - 1];
        let mut ext = Vec::with_capacity(n + 2 * edge);
        ext.extend((1..=edge).rev().map(|i| 2.0 * first - signal[i]));
        ext.extend_from_slice(signal);
        ext.extend((1..=edge).map(|i| 2.0 * last - signal[n - 1 - i]));

        let x0 = ext[0];
        self.run(&mut ext, x0);
        ext.reverse();
        let y0 = ext[0];
        self.run(&mut ext, y0);
        ext.reverse();

        ext[edge..edge + n].to_vec()
    }
}

/// Group digital poles into denominator polynomials of second-order sections
fn pair_poles(poles: &[Complex64]) -> Vec<[f64; 3]> {
    const EPS: f64 = 1e-12;
    let mut sections = Vec::with_capacity(poles.len() / 2);
    let mut real: Vec<f64> = Vec::new();

    for p in poles {
        if p.im > EPS {
            sections.push([1.0, -2.0 * p.re, p.norm_sqr()]);
        } else if p.im.abs() <= EPS {
            real.push(p.re);
        }
    }

    real.sort_by(|a, b| a.total_cmp(b));
    for pair in real.chunks(2) {
        match *pair {
            [r1, r2] => sections.push([1.0, -(r1 + r2), r1 * r2]),
            [r] => sections.push([1.0, -r, 0.0]),
            _ => {}
        }
    }
    sections
}

/// Band-limiting preprocessor applied to every channel before spectral estimation
#[derive(Clone, Debug)]
pub struct Preprocessor {
    filter: ButterworthBandpass,
    min_samples: usize,
}

impl Preprocessor {
    /// Design the preprocessor from explicit parameters
    pub fn new(
        sample_rate: f64,
        low_hz: f64,
        high_hz: f64,
        order: usize,
        min_samples: usize,
    ) -> Result<Self, EegError> {
        let filter = ButterworthBandpass::design(sample_rate, low_hz, high_hz, order)?;
        Ok(Self {
            min_samples: min_samples.max(filter.edge_len()),
            filter,
        })
    }

    /// Design the preprocessor from the pipeline's filter settings
    pub fn from_config(config: &PipelineConfig) -> Result<Self, EegError> {
        let f = &config.filter;
        Self::new(config.sampling_rate, f.low_hz, f.high_hz, f.order, f.min_samples)
    }

    /// Filter one channel. Signals of `min_samples` or fewer are returned as is.
    pub fn apply(&self, signal: &[f64]) -> Vec<f64> {
        if signal.len() <= self.min_samples {
            return signal.to_vec();
        }
        self.filter.filtfilt(signal)
    }
}
