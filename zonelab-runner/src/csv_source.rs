//! CSV candle files.
//!
//! Layout: one file per symbol and timeframe, `<dir>/<SYMBOL>_<tf>.csv`, with
//! header `open_time,open,high,low,close,volume`. `open_time` is RFC 3339 or
//! epoch milliseconds.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zonelab_core::domain::{Candle, CandleSeries, Timeframe};

use crate::provider::{CandleProvider, FetchError};

#[derive(Debug, Deserialize)]
struct CsvRecord {
    open_time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Debug, Serialize)]
struct CsvRow {
    open_time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

fn parse_open_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

/// Reads candle series from a directory of CSV files.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", symbol.to_ascii_uppercase(), timeframe))
    }

    /// Write `series` in the layout `fetch` reads, creating the directory.
    pub fn write(&self, symbol: &str, series: &CandleSeries) -> Result<PathBuf, FetchError> {
        let path = self.path_for(symbol, series.timeframe());
        let io = |source: std::io::Error| FetchError::Io {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io)?;

        let mut writer = csv::Writer::from_path(&path).map_err(|e| csv_error(&path, 0, e))?;
        for (i, c) in series.candles().iter().enumerate() {
            writer
                .serialize(CsvRow {
                    open_time: c.open_time.to_rfc3339(),
                    open: c.open,
                    high: c.high,
                    low: c.low,
                    close: c.close,
                    volume: c.volume,
                })
                .map_err(|e| csv_error(&path, i as u64 + 1, e))?;
        }
        writer.flush().map_err(io)?;
        Ok(path)
    }
}

fn csv_error(path: &Path, record: u64, err: csv::Error) -> FetchError {
    if err.is_io_error() {
        if let csv::ErrorKind::Io(source) = err.into_kind() {
            return FetchError::Io {
                path: path.to_path_buf(),
                source,
            };
        }
        return FetchError::Parse {
            path: path.to_path_buf(),
            record,
            reason: "I/O failure".to_string(),
        };
    }
    FetchError::Parse {
        path: path.to_path_buf(),
        record,
        reason: err.to_string(),
    }
}

impl CandleProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<CandleSeries, FetchError> {
        let path = self.path_for(symbol, timeframe);
        if !path.exists() {
            return Err(FetchError::NotFound {
                symbol: symbol.to_string(),
                timeframe,
            });
        }

        let mut reader = csv::Reader::from_path(&path).map_err(|e| csv_error(&path, 0, e))?;
        let mut candles = Vec::new();
        for (i, row) in reader.deserialize::<CsvRecord>().enumerate() {
            let record = i as u64 + 1;
            let row = row.map_err(|e| csv_error(&path, record, e))?;
            let open_time = parse_open_time(&row.open_time).ok_or_else(|| FetchError::Parse {
                path: path.clone(),
                record,
                reason: format!("unrecognized open_time '{}'", row.open_time),
            })?;
            candles.push(Candle {
                open_time,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }
        debug!(symbol, %timeframe, rows = candles.len(), path = %path.display(), "csv loaded");

        CandleSeries::new(timeframe, candles).map_err(|source| FetchError::Data {
            symbol: symbol.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn open_time_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 0, 0).unwrap();
        assert_eq!(parse_open_time("2024-01-02T03:00:00Z"), Some(expected));
        assert_eq!(parse_open_time("2024-01-02T04:00:00+01:00"), Some(expected));
        assert_eq!(
            parse_open_time(&expected.timestamp_millis().to_string()),
            Some(expected)
        );
        assert_eq!(parse_open_time("yesterday"), None);
    }

    #[test]
    fn path_uses_symbol_and_timeframe_label() {
        let p = CsvProvider::new("/data");
        assert_eq!(
            p.path_for("btcusdt", Timeframe::H4),
            PathBuf::from("/data/BTCUSDT_4h.csv")
        );
    }
}
