//! Trend classifier: higher-timeframe closes in, BULL/BEAR/INVALID out.
//!
//! Three independent evidence layers vote:
//! - stacked: last close above (below) every EMA in the stack
//! - structure: the last k closes are strictly rising (falling)
//! - slope: the fastest EMA's last step is positive (negative)
//!
//! Two agreeing layers decide the direction; otherwise the trend is INVALID.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TrendParams;
use crate::domain::Direction;
use crate::indicators::ema_of_series;

/// Classifier verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Bull,
    Bear,
    Invalid,
}

/// Per-layer vote. `None` means the layer supports neither side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrendLayers {
    pub stacked: Option<Direction>,
    pub structure: Option<Direction>,
    pub slope: Option<Direction>,
}

impl TrendLayers {
    fn votes(&self, side: Direction) -> u8 {
        [self.stacked, self.structure, self.slope]
            .iter()
            .filter(|v| **v == Some(side))
            .count() as u8
    }
}

/// Derived fresh per call; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendState {
    pub direction: TrendDirection,
    /// Layers agreeing with `direction` (for INVALID: the larger side's count).
    pub evidence_layers: u8,
    pub layers: TrendLayers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TrendState {
    /// The tradeable direction, or `None` when INVALID.
    pub fn direction(&self) -> Option<Direction> {
        match self.direction {
            TrendDirection::Bull => Some(Direction::Bull),
            TrendDirection::Bear => Some(Direction::Bear),
            TrendDirection::Invalid => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrendError {
    #[error("insufficient data: {got} closes < longest moving-average period {needed}")]
    InsufficientData { needed: usize, got: usize },
}

#[derive(Debug, Clone)]
pub struct TrendClassifier {
    params: TrendParams,
}

impl TrendClassifier {
    pub fn new(params: &TrendParams) -> Self {
        Self {
            params: params.clone(),
        }
    }

    pub fn classify(&self, closes: &[f64]) -> Result<TrendState, TrendError> {
        let needed = self.params.longest_period();
        if closes.is_empty() || closes.len() < needed {
            return Err(TrendError::InsufficientData {
                needed,
                got: closes.len(),
            });
        }

        let n = closes.len();
        let last = closes[n - 1];
        let averages: Vec<Vec<f64>> = self
            .params
            .ma_periods
            .iter()
            .map(|&p| ema_of_series(closes, p))
            .collect();

        let layers = TrendLayers {
            stacked: stacked_layer(last, &averages),
            structure: structure_layer(closes, self.params.structure_lookback),
            slope: averages.first().and_then(|fast| slope_layer(fast)),
        };

        let bull = layers.votes(Direction::Bull);
        let bear = layers.votes(Direction::Bear);

        let state = if bull >= 2 {
            TrendState {
                direction: TrendDirection::Bull,
                evidence_layers: bull,
                layers,
                reason: None,
            }
        } else if bear >= 2 {
            TrendState {
                direction: TrendDirection::Bear,
                evidence_layers: bear,
                layers,
                reason: None,
            }
        } else {
            TrendState {
                direction: TrendDirection::Invalid,
                evidence_layers: bull.max(bear),
                layers,
                reason: Some("layers not aligned".to_string()),
            }
        };

        Ok(state)
    }
}

fn stacked_layer(last: f64, averages: &[Vec<f64>]) -> Option<Direction> {
    let values: Vec<f64> = averages
        .iter()
        .map(|series| series.last().copied().unwrap_or(f64::NAN))
        .collect();
    if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    if values.iter().all(|&v| last > v) {
        Some(Direction::Bull)
    } else if values.iter().all(|&v| last < v) {
        Some(Direction::Bear)
    } else {
        None
    }
}

fn structure_layer(closes: &[f64], k: usize) -> Option<Direction> {
    if k < 2 || closes.len() < k {
        return None;
    }
    let tail = &closes[closes.len() - k..];
    if tail.windows(2).all(|w| w[1] > w[0]) {
        Some(Direction::Bull)
    } else if tail.windows(2).all(|w| w[1] < w[0]) {
        Some(Direction::Bear)
    } else {
        None
    }
}

fn slope_layer(fast: &[f64]) -> Option<Direction> {
    let n = fast.len();
    if n < 2 {
        return None;
    }
    let step = fast[n - 1] - fast[n - 2];
    if !step.is_finite() {
        None
    } else if step > 0.0 {
        Some(Direction::Bull)
    } else if step < 0.0 {
        Some(Direction::Bear)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> TrendClassifier {
        TrendClassifier::new(&TrendParams {
            ma_periods: vec![3, 5, 8],
            structure_lookback: 3,
        })
    }

    fn ramp(n: usize, start: f64, step: f64) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }

    #[test]
    fn rising_series_is_bull_with_all_layers() {
        let state = classifier().classify(&ramp(30, 100.0, 1.0)).unwrap();
        assert_eq!(state.direction, TrendDirection::Bull);
        assert_eq!(state.evidence_layers, 3);
        assert_eq!(state.direction(), Some(Direction::Bull));
        assert!(state.reason.is_none());
    }

    #[test]
    fn falling_series_is_bear() {
        let state = classifier().classify(&ramp(30, 100.0, -1.0)).unwrap();
        assert_eq!(state.direction, TrendDirection::Bear);
        assert_eq!(state.evidence_layers, 3);
    }

    #[test]
    fn flat_series_is_invalid() {
        let state = classifier().classify(&[100.0; 30]).unwrap();
        assert_eq!(state.direction, TrendDirection::Invalid);
        assert_eq!(state.reason.as_deref(), Some("layers not aligned"));
        assert_eq!(state.direction(), None);
    }

    #[test]
    fn two_layers_are_enough() {
        // Long rise, then a final dip that breaks structure but stays above
        // every average with the fast EMA still rising.
        let mut closes = ramp(30, 100.0, 1.0);
        closes.push(128.5);
        let state = classifier().classify(&closes).unwrap();
        assert_eq!(state.layers.structure, None);
        assert_eq!(state.layers.stacked, Some(Direction::Bull));
        assert_eq!(state.layers.slope, Some(Direction::Bull));
        assert_eq!(state.direction, TrendDirection::Bull);
        assert_eq!(state.evidence_layers, 2);
    }

    #[test]
    fn insufficient_data_fails() {
        let err = classifier().classify(&ramp(7, 1.0, 1.0)).unwrap_err();
        assert_eq!(err, TrendError::InsufficientData { needed: 8, got: 7 });
        assert!(classifier().classify(&[]).is_err());
    }

    #[test]
    fn exactly_longest_period_is_accepted() {
        assert!(classifier().classify(&ramp(8, 1.0, 1.0)).is_ok());
    }
}
