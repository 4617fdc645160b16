//! Regime filter for low-directionality (chop) conditions.
//!
//! Four independent conditions are computed over a short trailing window:
//!
//! 1. body vs volatility: mean body is small relative to mean ATR
//! 2. weak net movement: window open-to-close travel is small relative to ATR × window
//! 3. range overlap: enough consecutive candle pairs share a meaningful range
//! 4. low volume: window volume is below a fraction of a longer baseline
//!
//! Chop is a majority vote: two or more conditions → chop, one → not chop.
//! Any division by a volatility or volume measure that is zero or missing
//! makes the dependent condition false.

use serde::{Deserialize, Serialize};

use crate::config::RegimeParams;
use crate::domain::Candle;
use crate::indicators::mean;

/// Minimum number of true conditions that makes a window chop.
pub const CHOP_VOTES: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegimeConditions {
    pub body_vs_volatility: bool,
    pub weak_net_movement: bool,
    pub range_overlap: bool,
    pub low_volume: bool,
}

impl RegimeConditions {
    pub fn count(&self) -> u8 {
        [
            self.body_vs_volatility,
            self.weak_net_movement,
            self.range_overlap,
            self.low_volume,
        ]
        .iter()
        .filter(|c| **c)
        .count() as u8
    }

    pub fn is_chop(&self) -> bool {
        self.count() >= CHOP_VOTES
    }
}

/// Raw measurements behind the conditions, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RegimeMetrics {
    pub avg_body: f64,
    pub avg_atr: f64,
    pub net_move: f64,
    pub overlap_pairs: usize,
    pub avg_volume: f64,
    pub baseline_volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeState {
    pub chop: bool,
    /// Number of true conditions (0–4).
    pub score: u8,
    pub conditions: RegimeConditions,
    pub metrics: RegimeMetrics,
}

/// Pre-displacement volatility compression measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Compression {
    /// ATR before the origin / mean ATR over the baseline before it.
    pub ratio: f64,
    pub compressed: bool,
}

#[derive(Debug, Clone)]
pub struct RegimeFilter {
    params: RegimeParams,
}

impl RegimeFilter {
    pub fn new(params: &RegimeParams) -> Self {
        Self {
            params: params.clone(),
        }
    }

    /// Evaluate the trailing window ending at the last candle.
    ///
    /// `atr` must be the ATR series over `candles` (same length).
    pub fn evaluate(&self, candles: &[Candle], atr: &[f64]) -> RegimeState {
        let n = candles.len();
        let w = self.params.window;
        if n < w || w < 2 || atr.len() != n {
            return not_measured();
        }

        let window = &candles[n - w..];
        let bodies: Vec<f64> = window.iter().map(Candle::body).collect();
        let avg_body = mean(&bodies).unwrap_or(f64::NAN);
        let avg_atr = mean(&atr[n - w..]).unwrap_or(f64::NAN);
        let net_move = (window[w - 1].close - window[0].open).abs();

        let volatility_ok = avg_atr.is_finite() && avg_atr > 0.0;
        let overlap_floor = self.params.overlap_atr_frac * avg_atr;
        let overlap_pairs = if volatility_ok {
            window
                .windows(2)
                .filter(|pair| {
                    let shared = pair[0].high.min(pair[1].high) - pair[0].low.max(pair[1].low);
                    shared > overlap_floor
                })
                .count()
        } else {
            0
        };

        let window_volumes: Vec<f64> = window.iter().map(|c| c.volume).collect();
        let avg_volume = mean(&window_volumes).unwrap_or(f64::NAN);
        let b = self.params.volume_baseline.min(n);
        let baseline_volumes: Vec<f64> = candles[n - b..].iter().map(|c| c.volume).collect();
        let baseline_volume = mean(&baseline_volumes).unwrap_or(f64::NAN);

        let conditions = RegimeConditions {
            body_vs_volatility: volatility_ok && avg_body < self.params.body_atr_ratio * avg_atr,
            weak_net_movement: volatility_ok
                && net_move < self.params.net_move_ratio * avg_atr * w as f64,
            range_overlap: volatility_ok && overlap_pairs >= self.params.min_overlap_pairs,
            low_volume: baseline_volume.is_finite()
                && baseline_volume > 0.0
                && avg_volume < self.params.low_volume_ratio * baseline_volume,
        };

        RegimeState {
            chop: conditions.is_chop(),
            score: conditions.count(),
            conditions,
            metrics: RegimeMetrics {
                avg_body,
                avg_atr,
                net_move,
                overlap_pairs,
                avg_volume,
                baseline_volume,
            },
        }
    }

    /// Was volatility compressed right before the candle at `origin_index`?
    ///
    /// Compares ATR at `origin_index - 1` with the mean of the finite ATR values
    /// over the `volume_baseline` candles before it. `None` when either side is
    /// unavailable or zero.
    pub fn compression(&self, atr: &[f64], origin_index: usize) -> Option<Compression> {
        if origin_index < 2 || origin_index > atr.len() {
            return None;
        }
        let before = origin_index - 1;
        let current = atr[before];
        if !(current.is_finite() && current > 0.0) {
            return None;
        }
        let start = before.saturating_sub(self.params.volume_baseline);
        let history: Vec<f64> = atr[start..before]
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .collect();
        let baseline = mean(&history).filter(|m| *m > 0.0)?;
        let ratio = current / baseline;
        Some(Compression {
            ratio,
            compressed: ratio < self.params.compression_ratio,
        })
    }
}

fn not_measured() -> RegimeState {
    RegimeState {
        chop: false,
        score: 0,
        conditions: RegimeConditions::default(),
        metrics: RegimeMetrics {
            avg_body: f64::NAN,
            avg_atr: f64::NAN,
            net_move: f64::NAN,
            overlap_pairs: 0,
            avg_volume: f64::NAN,
            baseline_volume: f64::NAN,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{make_ohlc_candles, Atr, Indicator};

    fn filter() -> RegimeFilter {
        RegimeFilter::new(&RegimeParams::default())
    }

    fn conditions(flags: [bool; 4]) -> RegimeConditions {
        RegimeConditions {
            body_vs_volatility: flags[0],
            weak_net_movement: flags[1],
            range_overlap: flags[2],
            low_volume: flags[3],
        }
    }

    #[test]
    fn majority_vote_boundary() {
        assert!(!conditions([false; 4]).is_chop());
        for i in 0..4 {
            let mut one = [false; 4];
            one[i] = true;
            assert!(!conditions(one).is_chop(), "exactly one condition must not be chop");
        }
        assert!(conditions([true, true, false, false]).is_chop());
        assert!(conditions([false, false, true, true]).is_chop());
        assert!(conditions([true; 4]).is_chop());
        assert_eq!(conditions([true, false, true, false]).count(), 2);
    }

    #[test]
    fn alternating_small_bodies_are_chop() {
        let rows: Vec<(f64, f64, f64, f64)> = (0..60)
            .map(|i| {
                if i % 2 == 0 {
                    (100.0, 100.5, 99.7, 100.2)
                } else {
                    (100.2, 100.5, 99.7, 100.0)
                }
            })
            .collect();
        let candles = make_ohlc_candles(&rows);
        let atr = Atr::new(14).compute(&candles);
        let state = filter().evaluate(&candles, &atr);
        assert!(state.conditions.body_vs_volatility);
        assert!(state.conditions.weak_net_movement);
        assert!(state.conditions.range_overlap);
        assert!(!state.conditions.low_volume);
        assert_eq!(state.score, 3);
        assert!(state.chop);
    }

    #[test]
    fn clean_trend_is_not_chop() {
        // Each candle opens at the prior close and rises 1.0 with 0.5 wicks,
        // so consecutive ranges still overlap: exactly one condition holds.
        let rows: Vec<(f64, f64, f64, f64)> = (0..60)
            .map(|i| {
                let o = 100.0 + i as f64;
                (o, o + 1.5, o - 0.5, o + 1.0)
            })
            .collect();
        let candles = make_ohlc_candles(&rows);
        let atr = Atr::new(14).compute(&candles);
        let state = filter().evaluate(&candles, &atr);
        assert!(!state.conditions.body_vs_volatility);
        assert!(!state.conditions.weak_net_movement);
        assert!(state.conditions.range_overlap);
        assert!(!state.conditions.low_volume);
        assert_eq!(state.score, 1);
        assert!(!state.chop);
    }

    #[test]
    fn zero_atr_disables_volatility_conditions() {
        let rows: Vec<(f64, f64, f64, f64)> = (0..20).map(|_| (1.0, 1.0, 1.0, 1.0)).collect();
        let candles = make_ohlc_candles(&rows);
        let atr = vec![0.0; candles.len()];
        let state = filter().evaluate(&candles, &atr);
        assert!(!state.conditions.body_vs_volatility);
        assert!(!state.conditions.weak_net_movement);
        assert!(!state.conditions.range_overlap);
        assert!(!state.chop);
    }

    #[test]
    fn short_input_is_not_chop() {
        let candles = make_ohlc_candles(&[(1.0, 2.0, 0.5, 1.5); 3]);
        let state = filter().evaluate(&candles, &[1.0; 3]);
        assert!(!state.chop);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn compression_ratio() {
        let mut atr = vec![2.0; 60];
        atr[39] = 1.0;
        let c = filter().compression(&atr, 40).unwrap();
        assert!((c.ratio - 0.5).abs() < 1e-12);
        assert!(c.compressed);

        let c = filter().compression(&vec![2.0; 60], 40).unwrap();
        assert!(!c.compressed);

        assert!(filter().compression(&vec![f64::NAN; 60], 40).is_none());
        assert!(filter().compression(&atr, 1).is_none());
    }
}
