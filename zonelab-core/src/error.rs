//! Structured error types for the evaluator.
//!
//! Only two things are errors: a malformed input snapshot (`DataError`) and a
//! malformed configuration (`ConfigError`). Everything else the pipeline can
//! conclude (no trend, no zone, chop, low score) is a `NO_TRADE` signal with a
//! reason code, not an error.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::Timeframe;

/// Fatal problems with a candle series or snapshot. Raised before any
/// pipeline stage runs; no partial computation happens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("candle series is empty")]
    Empty,

    #[error("open times are not strictly ascending at index {index}")]
    NonMonotonic { index: usize },

    #[error("open time at index {index} is not aligned to the {timeframe} grid")]
    Misaligned { index: usize, timeframe: Timeframe },

    #[error("gap or overlap at index {index}: expected open time {expected}, found {actual}")]
    GapOrOverlap {
        index: usize,
        expected: DateTime<Utc>,
        actual: DateTime<Utc>,
    },

    #[error("malformed candle at index {index}: {reason}")]
    MalformedCandle { index: usize, reason: String },

    #[error("last candle closes at {close_time} which is after the evaluation clock {as_of}")]
    FormingCandle {
        close_time: DateTime<Utc>,
        as_of: DateTime<Utc>,
    },

    #[error("higher-timeframe series closes at {htf_close}, after the execution series' last close {execution_close}")]
    HtfAhead {
        htf_close: DateTime<Utc>,
        execution_close: DateTime<Utc>,
    },

    #[error("forming candle opens at {actual}, expected {expected} (right after the last closed candle)")]
    ForeignForming {
        expected: DateTime<Utc>,
        actual: DateTime<Utc>,
    },

    #[error("{series} series has timeframe {actual}, configuration expects {expected}")]
    TimeframeMismatch {
        series: &'static str,
        expected: Timeframe,
        actual: Timeframe,
    },
}

/// Invalid evaluator configuration. Raised at construction, never per call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("config parse error: {0}")]
    Parse(String),

    #[error("config I/O error: {0}")]
    Io(String),

    #[error("unknown asset profile '{0}' (expected default, major, altcoin or index)")]
    UnknownProfile(String),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
