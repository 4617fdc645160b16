//! The complete, immutable input of one evaluation.

use chrono::{DateTime, Utc};

use super::candle::{Candle, CandleSeries};
use crate::error::DataError;

/// Everything the evaluator looks at for one symbol at one moment.
///
/// `forming` is the live, still-updating execution bar. The caller merges it in
/// explicitly; it is never appended to `execution` and never feeds an
/// indicator. `as_of` is the caller's clock: when set, the last candle of each
/// series must have closed at or before it. The higher-timeframe series never
/// extends past the execution series, clock or not.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub htf: CandleSeries,
    pub execution: CandleSeries,
    pub as_of: Option<DateTime<Utc>>,
    pub forming: Option<Candle>,
}

impl Snapshot {
    pub fn new(htf: CandleSeries, execution: CandleSeries) -> Self {
        Self {
            htf,
            execution,
            as_of: None,
            forming: None,
        }
    }

    pub fn with_clock(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn with_forming(mut self, forming: Candle) -> Self {
        self.forming = Some(forming);
        self
    }

    /// Check the no-lookahead contract: the higher timeframe closes no later
    /// than the execution series, no series ends in a candle that has not
    /// closed yet, and the forming bar (if any) directly follows the execution
    /// series.
    pub fn validate(&self) -> Result<(), DataError> {
        let htf_close = self.htf.last_close_time();
        let execution_close = self.execution.last_close_time();
        if htf_close > execution_close {
            return Err(DataError::HtfAhead {
                htf_close,
                execution_close,
            });
        }

        if let Some(as_of) = self.as_of {
            for series in [&self.htf, &self.execution] {
                let close_time = series.last_close_time();
                if close_time > as_of {
                    return Err(DataError::FormingCandle { close_time, as_of });
                }
            }
        }

        if let Some(forming) = &self.forming {
            let expected = self.execution.last_close_time();
            if forming.open_time != expected {
                return Err(DataError::ForeignForming {
                    expected,
                    actual: forming.open_time,
                });
            }
            if !forming.is_sane() {
                return Err(DataError::MalformedCandle {
                    index: self.execution.len(),
                    reason: "forming candle is not sane".to_string(),
                });
            }
        }

        Ok(())
    }
}
