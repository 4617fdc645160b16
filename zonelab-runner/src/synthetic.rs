//! Deterministic synthetic candles for development and demos.
//!
//! Produces a seeded random walk per (seed, symbol, timeframe) with a
//! per-symbol drift and occasional high-volume displacement candles, so that
//! scans over a synthetic universe exercise every pipeline branch. Synthetic
//! data is clearly fake; never use it for decisions.

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zonelab_core::domain::{Candle, CandleSeries, Timeframe};

use crate::provider::{CandleProvider, FetchError};

/// Probability that a candle is a displacement candle.
const DISPLACEMENT_ODDS: f64 = 0.03;

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    seed: u64,
    len: usize,
    end: DateTime<Utc>,
}

impl SyntheticProvider {
    /// `len` candles per series, the last one closing at or before `end`.
    pub fn new(seed: u64, len: usize, end: DateTime<Utc>) -> Self {
        Self { seed, len, end }
    }

    /// Fixed end anchor so output never depends on the wall clock.
    pub fn with_default_anchor(seed: u64, len: usize) -> Self {
        let end = Utc
            .with_ymd_and_hms(2024, 6, 1, 0, 0, 0)
            .single()
            .unwrap_or_default();
        Self::new(seed, len, end)
    }

    fn rng_for(&self, symbol: &str, timeframe: Timeframe) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        hasher.update(timeframe.as_str().as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    /// Generate the candles. Pure function of (seed, len, end, symbol, timeframe).
    pub fn generate(&self, symbol: &str, timeframe: Timeframe) -> Vec<Candle> {
        let mut rng = self.rng_for(symbol, timeframe);
        let step = timeframe.duration();
        let secs = timeframe.seconds();
        let aligned_end = self.end.timestamp().div_euclid(secs) * secs;
        let first_open = aligned_end - secs * self.len as i64;
        let Some(mut open_time) = DateTime::<Utc>::from_timestamp(first_open, 0) else {
            return Vec::new();
        };

        // Symbol-level drift in units of the typical candle range.
        let drift: f64 = rng.gen_range(-0.25..0.25);
        let mut price = 100.0_f64;
        let mut candles = Vec::with_capacity(self.len);

        for _ in 0..self.len {
            let unit = price * 0.004;
            let displacement = rng.gen_bool(DISPLACEMENT_ODDS);
            let mut body = (drift + rng.gen_range(-0.6..0.6)) * unit;
            let mut volume = rng.gen_range(800.0..1200.0);
            if displacement {
                body = drift.signum() * rng.gen_range(2.5..4.0) * unit;
                volume *= rng.gen_range(2.0..3.5);
            }

            let open = price;
            let close = (open + body).max(1.0);
            let high = open.max(close) + rng.gen_range(0.0..0.5) * unit;
            let low = (open.min(close) - rng.gen_range(0.0..0.5) * unit).max(0.5);

            candles.push(Candle {
                open_time,
                open,
                high,
                low,
                close,
                volume,
            });
            price = close;
            open_time += step;
        }

        candles
    }
}

impl CandleProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<CandleSeries, FetchError> {
        if self.len == 0 {
            return Err(FetchError::NotFound {
                symbol: symbol.to_string(),
                timeframe,
            });
        }
        CandleSeries::new(timeframe, self.generate(symbol, timeframe)).map_err(|source| {
            FetchError::Data {
                symbol: symbol.to_string(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_data_is_deterministic() {
        let p = SyntheticProvider::with_default_anchor(7, 300);
        let a = p.fetch("BTCUSDT", Timeframe::H1).unwrap();
        let b = p.fetch("BTCUSDT", Timeframe::H1).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 300);
    }

    #[test]
    fn seed_and_symbol_change_the_walk() {
        let p = SyntheticProvider::with_default_anchor(7, 50);
        let q = SyntheticProvider::with_default_anchor(8, 50);
        let a = p.generate("BTCUSDT", Timeframe::H1);
        assert_ne!(a, p.generate("ETHUSDT", Timeframe::H1));
        assert_ne!(a, q.generate("BTCUSDT", Timeframe::H1));
    }

    #[test]
    fn series_ends_before_anchor_and_is_aligned() {
        let p = SyntheticProvider::with_default_anchor(1, 120);
        for tf in [Timeframe::M15, Timeframe::H4, Timeframe::D1] {
            let s = p.fetch("SOLUSDT", tf).unwrap();
            assert!(s.last_close_time() <= p.end);
            assert!(s.candles().iter().all(|c| c.is_sane()));
        }
    }

    #[test]
    fn zero_length_is_not_found() {
        let p = SyntheticProvider::with_default_anchor(1, 0);
        assert!(matches!(
            p.fetch("X", Timeframe::H1),
            Err(FetchError::NotFound { .. })
        ));
    }
}
