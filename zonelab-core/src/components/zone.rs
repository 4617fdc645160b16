//! Displacement-zone detector.
//!
//! Scans backward from the most recent closed candle (excluding it) for the
//! latest "displacement" candle: a body larger than k₁·ATR, volume at least
//! k₂ × the trailing average, and direction agreeing with the requested
//! polarity both candle-wise (close vs open) and bar-to-bar (close vs prior
//! close). The candle's high/low, padded by ATR fractions, becomes the zone.
//!
//! Padding is asymmetric: wider on the continuation side (above for BULL,
//! below for BEAR), narrower on the invalidation side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ZoneParams;
use crate::domain::{Candle, Direction};
use crate::indicators::{positive_at, trailing_mean};

/// Ephemeral price zone; recomputed every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub min: f64,
    pub max: f64,
    pub midpoint: f64,
    /// Index of the origin candle in the execution series.
    pub origin_index: usize,
    pub origin_time: DateTime<Utc>,
    /// Body / ATR of the origin candle.
    pub strength: f64,
    pub polarity: Direction,
    /// ATR the origin candle displaced from.
    pub atr: f64,
}

impl Zone {
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }

    /// Zone edge a trade in the zone's direction is invalidated beyond.
    pub fn invalidation_edge(&self) -> f64 {
        match self.polarity {
            Direction::Bull => self.min,
            Direction::Bear => self.max,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ZoneDetector {
    params: ZoneParams,
    volume_window: usize,
}

impl ZoneDetector {
    /// `volume_window` is the trailing-average length for volume (the ATR period).
    pub fn new(params: &ZoneParams, volume_window: usize) -> Self {
        Self {
            params: params.clone(),
            volume_window,
        }
    }

    /// Most recent qualifying zone, or `None`.
    ///
    /// `atr` must be the ATR series computed over `candles` (same length).
    pub fn detect(&self, candles: &[Candle], atr: &[f64], polarity: Direction) -> Option<Zone> {
        let n = candles.len();
        if n < 3 || atr.len() != n {
            return None;
        }

        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
        let newest = n - 2;
        let oldest = (n - 1).saturating_sub(self.params.lookback).max(1);
        if oldest > newest {
            return None;
        }

        (oldest..=newest)
            .rev()
            .find_map(|i| self.qualify(candles, atr, &volumes, i, polarity))
    }

    fn qualify(
        &self,
        candles: &[Candle],
        atr: &[f64],
        volumes: &[f64],
        i: usize,
        polarity: Direction,
    ) -> Option<Zone> {
        let candle = &candles[i];
        let prev = &candles[i - 1];

        let atr_prev = positive_at(atr, i - 1)?;
        let avg_volume =
            trailing_mean(volumes, i, self.volume_window).filter(|v| v.is_finite() && *v > 0.0)?;

        let directional = match polarity {
            Direction::Bull => candle.close > candle.open && candle.close > prev.close,
            Direction::Bear => candle.close < candle.open && candle.close < prev.close,
        };
        if !directional {
            return None;
        }

        let body = candle.body();
        let strength = body / atr_prev;
        if body <= self.params.displacement_body_atr * atr_prev
            || candle.volume < self.params.volume_multiplier * avg_volume
            || strength < self.params.min_strength
        {
            return None;
        }

        let cont = self.params.pad_continuation_atr * atr_prev;
        let inv = self.params.pad_invalidation_atr * atr_prev;
        let (min, max) = match polarity {
            Direction::Bull => (candle.low - inv, candle.high + cont),
            Direction::Bear => (candle.low - cont, candle.high + inv),
        };
        if !(min < max) {
            return None;
        }

        Some(Zone {
            min,
            max,
            midpoint: (min + max) / 2.0,
            origin_index: i,
            origin_time: candle.open_time,
            strength,
            polarity,
            atr: atr_prev,
        })
    }
}
