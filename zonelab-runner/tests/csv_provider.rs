//! CSV provider against real files in a temporary directory.

use std::fs;

use chrono::{Duration, TimeZone, Utc};
use zonelab_core::domain::{Candle, CandleSeries, Timeframe};
use zonelab_core::DataError;
use zonelab_runner::{CandleProvider, CsvProvider, FetchError, SyntheticProvider};

const HEADER: &str = "open_time,open,high,low,close,volume\n";

#[test]
fn written_series_reads_back_identically() {
    let dir = tempfile::tempdir().unwrap();
    let provider = CsvProvider::new(dir.path().join("candles"));
    let series = SyntheticProvider::with_default_anchor(3, 120)
        .fetch("BTCUSDT", Timeframe::H1)
        .unwrap();

    let path = provider.write("btcusdt", &series).unwrap();
    assert!(path.ends_with("BTCUSDT_1h.csv"));

    let loaded = provider.fetch("BTCUSDT", Timeframe::H1).unwrap();
    assert_eq!(loaded, series);
}

#[test]
fn epoch_millisecond_timestamps_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let mut text = HEADER.to_string();
    for i in 0..3 {
        let t = t0 + Duration::hours(4 * i);
        text.push_str(&format!("{},10,11,9,10.5,100\n", t.timestamp_millis()));
    }
    fs::write(dir.path().join("ETHUSDT_4h.csv"), text).unwrap();

    let series = CsvProvider::new(dir.path())
        .fetch("ETHUSDT", Timeframe::H4)
        .unwrap();
    assert_eq!(series.len(), 3);
    assert_eq!(series.candles()[0].open_time, t0);
    assert_eq!(series.last().close, 10.5);
}

#[test]
fn missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = CsvProvider::new(dir.path())
        .fetch("SOLUSDT", Timeframe::M15)
        .unwrap_err();
    assert!(matches!(err, FetchError::NotFound { timeframe: Timeframe::M15, .. }));
    assert!(!err.is_retryable());
}

#[test]
fn bad_number_reports_record() {
    let dir = tempfile::tempdir().unwrap();
    let text = format!(
        "{HEADER}2024-01-01T00:00:00Z,1,2,0.5,1.5,10\n2024-01-01T01:00:00Z,1,two,0.5,1.5,10\n"
    );
    fs::write(dir.path().join("XRPUSDT_1h.csv"), text).unwrap();

    match CsvProvider::new(dir.path()).fetch("XRPUSDT", Timeframe::H1) {
        Err(FetchError::Parse { record, .. }) => assert_eq!(record, 2),
        other => panic!("expected Parse error, got {other:?}"),
    }
}

#[test]
fn unparseable_open_time_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let text = format!("{HEADER}last tuesday,1,2,0.5,1.5,10\n");
    fs::write(dir.path().join("XRPUSDT_1h.csv"), text).unwrap();

    let err = CsvProvider::new(dir.path())
        .fetch("XRPUSDT", Timeframe::H1)
        .unwrap_err();
    assert!(err.to_string().contains("last tuesday"));
}

#[test]
fn gap_in_file_is_a_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let text = format!(
        "{HEADER}2024-01-01T00:00:00Z,1,2,0.5,1.5,10\n2024-01-01T02:00:00Z,1,2,0.5,1.5,10\n"
    );
    fs::write(dir.path().join("ADAUSDT_1h.csv"), text).unwrap();

    match CsvProvider::new(dir.path()).fetch("ADAUSDT", Timeframe::H1) {
        Err(FetchError::Data { symbol, source }) => {
            assert_eq!(symbol, "ADAUSDT");
            assert!(matches!(source, DataError::GapOrOverlap { index: 1, .. }));
        }
        other => panic!("expected Data error, got {other:?}"),
    }
}

#[test]
fn header_only_file_is_empty_data() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("BNBUSDT_1d.csv"), HEADER).unwrap();

    assert!(matches!(
        CsvProvider::new(dir.path()).fetch("BNBUSDT", Timeframe::D1),
        Err(FetchError::Data {
            source: DataError::Empty,
            ..
        })
    ));
}

#[test]
fn write_then_fetch_under_another_timeframe_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let provider = CsvProvider::new(dir.path());
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let candle = Candle {
        open_time: t0,
        open: 1.0,
        high: 2.0,
        low: 0.5,
        close: 1.5,
        volume: 10.0,
    };
    let series = CandleSeries::new(Timeframe::D1, vec![candle]).unwrap();
    provider.write("DOTUSDT", &series).unwrap();

    assert!(provider.fetch("DOTUSDT", Timeframe::D1).is_ok());
    assert!(matches!(
        provider.fetch("DOTUSDT", Timeframe::H1),
        Err(FetchError::NotFound { .. })
    ));
}
