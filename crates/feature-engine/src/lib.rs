//! Feature Engineering Engine
//!
//! Zero-phase band-pass preprocessing, Welch band power estimation and the
//! canonical channel × band feature layout shared by every dataset.

mod features;
mod filter;
mod schema;
mod spectral;

pub use features::{FeatureExtractor, FeatureVector};
pub use filter::{BiquadCoeffs, ButterworthBandpass, Preprocessor};
pub use schema::{feature_name, FeatureSchema, SCHEMA_VERSION};
pub use spectral::{PowerSpectrum, WelchEstimator};
