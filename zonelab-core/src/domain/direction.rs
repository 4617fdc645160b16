//! Trade direction / zone polarity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional bias of a trend, zone or trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Bull,
    Bear,
}

impl Direction {
    /// +1.0 for Bull, -1.0 for Bear. Multiplies price offsets so one formula
    /// projects levels in either direction.
    pub fn sign(self) -> f64 {
        match self {
            Self::Bull => 1.0,
            Self::Bear => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Bull => Self::Bear,
            Self::Bear => Self::Bull,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bull => f.write_str("BULL"),
            Self::Bear => f.write_str("BEAR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_opposite() {
        assert_eq!(Direction::Bull.sign(), 1.0);
        assert_eq!(Direction::Bear.sign(), -1.0);
        assert_eq!(Direction::Bull.opposite(), Direction::Bear);
    }

    #[test]
    fn serializes_screaming_case() {
        assert_eq!(serde_json::to_string(&Direction::Bear).unwrap(), "\"BEAR\"");
    }
}
