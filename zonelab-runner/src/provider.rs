//! Candle provider trait and structured fetch errors.
//!
//! The `CandleProvider` trait abstracts over candle sources (CSV files, the
//! synthetic generator, an exchange client) so the scanner can swap
//! implementations and tests can inject failures.

use std::path::PathBuf;

use thiserror::Error;
use zonelab_core::domain::{CandleSeries, Timeframe};
use zonelab_core::DataError;

/// Structured error types for candle retrieval.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no {timeframe} candles for {symbol}")]
    NotFound { symbol: String, timeframe: Timeframe },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error in {path} at record {record}: {reason}")]
    Parse {
        path: PathBuf,
        record: u64,
        reason: String,
    },

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("provider refused access: {0}")]
    Banned(String),

    #[error("hard stop: circuit breaker open ({remaining_secs}s cooldown remaining)")]
    CircuitOpen { remaining_secs: u64 },

    #[error("invalid candle data for {symbol}: {source}")]
    Data {
        symbol: String,
        #[source]
        source: DataError,
    },

    #[error("gave up on {symbol} after {attempts} attempts: {last}")]
    RetriesExhausted {
        symbol: String,
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Transient failures worth another attempt. Everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::RateLimited { .. })
    }
}

/// Trait for candle sources.
///
/// Implementations return closed candles only; the forming bar is the caller's
/// business.
pub trait CandleProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the validated candle series for one symbol and timeframe.
    fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<CandleSeries, FetchError>;
}

impl<P: CandleProvider + ?Sized> CandleProvider for &P {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<CandleSeries, FetchError> {
        (**self).fetch(symbol, timeframe)
    }
}

impl<P: CandleProvider + ?Sized> CandleProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<CandleSeries, FetchError> {
        (**self).fetch(symbol, timeframe)
    }
}
