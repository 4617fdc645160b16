//! Candles and validated candle series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timeframe::Timeframe;
use crate::error::DataError;

/// OHLCV candle for one period of one timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Returns true if any OHLCV field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite())
    }

    /// Basic OHLCV sanity check: high >= low, high >= open/close, low <= open/close.
    pub fn is_sane(&self) -> bool {
        self.insanity().is_none()
    }

    fn insanity(&self) -> Option<&'static str> {
        if self.is_void() {
            return Some("non-finite field");
        }
        if self.high < self.low {
            return Some("high below low");
        }
        if self.high < self.open.max(self.close) {
            return Some("high below open/close");
        }
        if self.low > self.open.min(self.close) {
            return Some("low above open/close");
        }
        if self.volume < 0.0 {
            return Some("negative volume");
        }
        None
    }

    pub fn close_time(&self, timeframe: Timeframe) -> DateTime<Utc> {
        self.open_time + timeframe.duration()
    }

    /// Absolute body size |close - open|.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Full high-low range.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// True if this candle's [low, high] range intersects `[lo, hi]`.
    pub fn intersects(&self, lo: f64, hi: f64) -> bool {
        self.low <= hi && self.high >= lo
    }
}

/// An ordered, immutable, validated sequence of closed candles for one timeframe.
///
/// The only way to build one is [`CandleSeries::new`], which enforces:
/// non-empty, strictly ascending open times, open times on the timeframe grid,
/// fixed spacing of exactly one period, and sane OHLCV values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandleSeries {
    timeframe: Timeframe,
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(timeframe: Timeframe, candles: Vec<Candle>) -> Result<Self, DataError> {
        if candles.is_empty() {
            return Err(DataError::Empty);
        }

        let step = timeframe.duration();
        for (index, candle) in candles.iter().enumerate() {
            if let Some(reason) = candle.insanity() {
                return Err(DataError::MalformedCandle {
                    index,
                    reason: reason.to_string(),
                });
            }
            if !timeframe.is_aligned(candle.open_time) {
                return Err(DataError::Misaligned { index, timeframe });
            }
            if index == 0 {
                continue;
            }
            let prev = candles[index - 1].open_time;
            if candle.open_time <= prev {
                return Err(DataError::NonMonotonic { index });
            }
            let expected = prev + step;
            if candle.open_time != expected {
                return Err(DataError::GapOrOverlap {
                    index,
                    expected,
                    actual: candle.open_time,
                });
            }
        }

        Ok(Self { timeframe, candles })
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Always false for a constructed series; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Most recent closed candle.
    pub fn last(&self) -> &Candle {
        // Non-empty by construction.
        &self.candles[self.candles.len() - 1]
    }

    /// Close time of the most recent candle.
    pub fn last_close_time(&self) -> DateTime<Utc> {
        self.last().close_time(self.timeframe)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// A new series holding the first `len` candles, or `None` if `len` is 0
    /// or exceeds the series length. Used by replay-style callers and tests to
    /// evaluate "as of" an earlier bar.
    pub fn prefix(&self, len: usize) -> Option<Self> {
        if len == 0 || len > self.candles.len() {
            return None;
        }
        Some(Self {
            timeframe: self.timeframe,
            candles: self.candles[..len].to_vec(),
        })
    }
}
