//! Mental-state labels shared by every dataset

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete mental state assigned to each window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MentalState {
    /// High attention / alert-engaged
    Focused,
    /// Distracted / transitional
    Unfocused,
    /// Fatigued / low arousal
    Drowsy,
}

impl MentalState {
    /// All labels in storage order
    pub const ALL: [MentalState; 3] = [
        MentalState::Focused,
        MentalState::Unfocused,
        MentalState::Drowsy,
    ];

    /// Integer code persisted in the feature store
    pub fn code(&self) -> i64 {
        match self {
            MentalState::Focused => 0,
            MentalState::Unfocused => 1,
            MentalState::Drowsy => 2,
        }
    }

    /// Decode a persisted label code
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(MentalState::Focused),
            1 => Some(MentalState::Unfocused),
            2 => Some(MentalState::Drowsy),
            _ => None,
        }
    }

    /// Position in [`MentalState::ALL`]
    pub fn index(&self) -> usize {
        self.code() as usize
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MentalState::Focused => "Focused",
            MentalState::Unfocused => "Unfocused",
            MentalState::Drowsy => "Drowsy",
        }
    }
}

impl fmt::Display for MentalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for state in MentalState::ALL {
            assert_eq!(MentalState::from_code(state.code()), Some(state));
            assert_eq!(MentalState::ALL[state.index()], state);
        }
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(MentalState::from_code(3), None);
        assert_eq!(MentalState::from_code(-1), None);
    }
}
