//! Frequency band definitions

use crate::EegError;
use serde::{Deserialize, Serialize};

/// Named frequency interval in Hz
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Band name, used verbatim in feature column names
    pub name: String,
    /// Lower edge (Hz)
    pub low_hz: f64,
    /// Upper edge (Hz)
    pub high_hz: f64,
}

impl Band {
    /// Create a new band
    pub fn new(name: &str, low_hz: f64, high_hz: f64) -> Self {
        Self {
            name: name.to_string(),
            low_hz,
            high_hz,
        }
    }

    /// Check band bounds and name.
    ///
    /// The name ends up inside a storage column identifier, so it is limited
    /// to lowercase ASCII letters, digits and underscores.
    pub fn validate(&self) -> Result<(), EegError> {
        let name_ok = !self.name.is_empty()
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !name_ok {
            return Err(EegError::InvalidParameter(format!(
                "band name {:?} must be non-empty lowercase [a-z0-9_]",
                self.name
            )));
        }
        if !(self.low_hz.is_finite() && self.high_hz.is_finite()) {
            return Err(EegError::InvalidParameter(format!(
                "band {} has non-finite bounds",
                self.name
            )));
        }
        if self.low_hz < 0.0 || self.low_hz >= self.high_hz {
            return Err(EegError::InvalidParameter(format!(
                "band {} requires 0 <= low < high, got [{}, {}]",
                self.name, self.low_hz, self.high_hz
            )));
        }
        Ok(())
    }

    /// Whether a frequency falls inside the band (both edges inclusive)
    pub fn contains(&self, freq_hz: f64) -> bool {
        freq_hz >= self.low_hz && freq_hz <= self.high_hz
    }
}

/// Delta, theta, alpha and beta in that order
pub fn canonical_bands() -> Vec<Band> {
    vec![
        Band::new("delta", 0.5, 4.0),
        Band::new("theta", 4.0, 8.0),
        Band::new("alpha", 8.0, 13.0),
        Band::new("beta", 13.0, 30.0),
    ]
}
