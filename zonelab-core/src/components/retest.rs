//! Retest validator: did price come back into the zone and get rejected?

use serde::{Deserialize, Serialize};

use crate::components::zone::Zone;
use crate::config::RetestParams;
use crate::domain::{Candle, Direction};

/// A confirmed retest of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetestResult {
    pub confirmed: bool,
    /// Index of the rejection candle in the execution series.
    pub index: usize,
    pub candle: Candle,
    /// Rejecting wick as a fraction of the candle's full range.
    pub wick_ratio: f64,
}

#[derive(Debug, Clone)]
pub struct RetestValidator {
    params: RetestParams,
}

impl RetestValidator {
    pub fn new(params: &RetestParams) -> Self {
        Self {
            params: params.clone(),
        }
    }

    /// Examine only the most recent `lookback` candles, newest first, and only
    /// candles after the zone's origin. First match wins.
    pub fn validate(
        &self,
        zone: &Zone,
        candles: &[Candle],
        polarity: Direction,
    ) -> Option<RetestResult> {
        let n = candles.len();
        if n == 0 {
            return None;
        }
        let oldest = n
            .saturating_sub(self.params.lookback)
            .max(zone.origin_index + 1);
        if oldest >= n {
            return None;
        }

        (oldest..n).rev().find_map(|i| {
            let candle = candles[i];
            if !candle.intersects(zone.min, zone.max) {
                return None;
            }
            let range = candle.range();
            if !(range > 0.0) {
                return None;
            }
            let (wick, confirms) = match polarity {
                Direction::Bull => (candle.lower_wick(), candle.close > candle.open),
                Direction::Bear => (candle.upper_wick(), candle.close < candle.open),
            };
            let wick_ratio = wick / range;
            if wick_ratio > self.params.wick_ratio && confirms {
                Some(RetestResult {
                    confirmed: true,
                    index: i,
                    candle,
                    wick_ratio,
                })
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_candles;
    use chrono::{TimeZone, Utc};

    fn bull_zone(origin_index: usize) -> Zone {
        Zone {
            min: 100.0,
            max: 104.0,
            midpoint: 102.0,
            origin_index,
            origin_time: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            strength: 3.0,
            polarity: Direction::Bull,
            atr: 2.0,
        }
    }

    fn validator() -> RetestValidator {
        RetestValidator::new(&RetestParams::default())
    }

    /// Candles far above the zone, with `hammer` placed at `at`.
    fn series_with(at: usize, hammer: (f64, f64, f64, f64)) -> Vec<Candle> {
        let mut rows: Vec<(f64, f64, f64, f64)> =
            (0..12).map(|_| (110.0, 111.0, 109.0, 110.5)).collect();
        rows[at] = hammer;
        make_ohlc_candles(&rows)
    }

    #[test]
    fn bull_hammer_in_zone_confirms() {
        // range 6, lower wick 103.5 - 99 = 4.5 → 0.75
        let candles = series_with(10, (103.5, 105.0, 99.0, 104.5));
        let r = validator()
            .validate(&bull_zone(2), &candles, Direction::Bull)
            .unwrap();
        assert!(r.confirmed);
        assert_eq!(r.index, 10);
        assert!((r.wick_ratio - 0.75).abs() < 1e-12);
    }

    #[test]
    fn bearish_close_does_not_confirm_bull() {
        let candles = series_with(10, (104.5, 105.0, 99.0, 103.5));
        assert!(validator()
            .validate(&bull_zone(2), &candles, Direction::Bull)
            .is_none());
    }

    #[test]
    fn small_wick_does_not_confirm() {
        // lower wick 0.5 of range 6
        let candles = series_with(10, (101.0, 107.0, 100.5, 106.5));
        assert!(validator()
            .validate(&bull_zone(2), &candles, Direction::Bull)
            .is_none());
    }

    #[test]
    fn outside_lookback_is_ignored() {
        // lookback 5 covers indices 7..=11
        let candles = series_with(6, (103.5, 105.0, 99.0, 104.5));
        assert!(validator()
            .validate(&bull_zone(2), &candles, Direction::Bull)
            .is_none());
    }

    #[test]
    fn candles_at_or_before_origin_are_ignored() {
        let candles = series_with(10, (103.5, 105.0, 99.0, 104.5));
        assert!(validator()
            .validate(&bull_zone(10), &candles, Direction::Bull)
            .is_none());
    }

    #[test]
    fn bear_shooting_star_confirms() {
        let zone = Zone {
            polarity: Direction::Bear,
            ..bull_zone(2)
        };
        let mut rows: Vec<(f64, f64, f64, f64)> =
            (0..12).map(|_| (90.0, 91.0, 89.0, 89.5)).collect();
        // upper wick 105 - 100.5 = 4.5 of range 6
        rows[11] = (100.5, 105.0, 99.0, 99.5);
        let candles = make_ohlc_candles(&rows);
        let r = validator().validate(&zone, &candles, Direction::Bear).unwrap();
        assert_eq!(r.index, 11);
    }

    #[test]
    fn zero_range_candle_is_skipped() {
        let candles = series_with(10, (102.0, 102.0, 102.0, 102.0));
        assert!(validator()
            .validate(&bull_zone(2), &candles, Direction::Bull)
            .is_none());
    }
}
