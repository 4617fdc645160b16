//! Look-ahead contamination tests.
//!
//! No indicator value at candle t may depend on data from candle t+1 or later.
//!
//! Method: compute on a truncated series (candles 0..150) and the full series
//! (candles 0..300). Values 0..150 must be identical between both runs. The
//! evaluator gets the same treatment: two datasets that agree up to a cut and
//! diverge after it must produce the same signal when evaluated at the cut.

use chrono::{DateTime, Duration, TimeZone, Utc};
use zonelab_core::domain::{Candle, CandleSeries, Snapshot, Timeframe};
use zonelab_core::fingerprint::DatasetHash;
use zonelab_core::indicators::*;
use zonelab_core::{DataError, Evaluator, EvaluatorConfig};

/// Deterministic pseudo-random walk (LCG) with realistic candle shapes.
fn make_test_candles(n: usize) -> Vec<Candle> {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut price = 100.0;
    (0..n)
        .map(|i| {
            let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
            let change = ((seed % 200) as f64 - 100.0) * 0.05;
            price = (price + change).max(10.0);

            let open = price - 0.5;
            let close = price + 0.3;
            Candle {
                open_time: t0 + Duration::hours(i as i64),
                open,
                high: open.max(close) + 2.0,
                low: open.min(close) - 2.0,
                close,
                volume: 1000.0 + (i as f64 * 100.0),
            }
        })
        .collect()
}

fn assert_same_prefix(name: &str, truncated: &[f64], full: &[f64]) {
    assert!(full.len() >= truncated.len(), "{name}: full shorter than truncated");
    for (i, (t, f)) in truncated.iter().zip(full).enumerate() {
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert!(
            !t.is_nan() && !f.is_nan(),
            "{name}: NaN mismatch at candle {i} (truncated={t}, full={f})"
        );
        assert!(
            (t - f).abs() < 1e-12,
            "{name}: look-ahead at candle {i}: truncated={t}, full={f}"
        );
    }
}

fn assert_no_lookahead(indicator: &dyn Indicator, full: &[Candle], truncated_len: usize) {
    let truncated = indicator.compute(&full[..truncated_len]);
    let complete = indicator.compute(full);
    assert_eq!(truncated.len(), truncated_len, "{}: length", indicator.name());
    assert_eq!(complete.len(), full.len(), "{}: length", indicator.name());
    assert_same_prefix(indicator.name(), &truncated, &complete);
}

#[test]
fn atr_no_lookahead() {
    let candles = make_test_candles(300);
    assert_no_lookahead(&Atr::new(14), &candles, 150);
}

#[test]
fn ema_no_lookahead() {
    let candles = make_test_candles(300);
    for period in [20, 50, 200] {
        assert_no_lookahead(&Ema::new(period), &candles, 150);
    }
}

#[test]
fn series_helpers_no_lookahead() {
    let candles = make_test_candles(300);
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    assert_same_prefix(
        "sma_20",
        &sma_of_series(&closes[..150], 20),
        &sma_of_series(&closes, 20),
    );
    assert_same_prefix(
        "ema_50",
        &ema_of_series(&closes[..150], 50),
        &ema_of_series(&closes, 50),
    );
    assert_same_prefix("true_range", &true_range(&candles[..150]), &true_range(&candles));

    for index in 14..150 {
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
        assert_eq!(
            trailing_mean(&volumes[..150], index, 14),
            trailing_mean(&volumes, index, 14)
        );
    }
}

/// Same walk as `make_test_candles`, on any timeframe and start.
fn walk(tf: Timeframe, start: DateTime<Utc>, n: usize) -> Vec<Candle> {
    make_test_candles(n)
        .into_iter()
        .enumerate()
        .map(|(i, c)| Candle {
            open_time: start + tf.duration() * i as i32,
            ..c
        })
        .collect()
}

/// Rescale every candle from `from` on: a different future, same past.
fn rewrite_after(candles: &[Candle], from: usize) -> Vec<Candle> {
    candles
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if i < from {
                return c;
            }
            Candle {
                open: c.open * 1.5,
                high: c.high * 1.5,
                low: c.low * 1.5,
                close: c.close * 1.5,
                volume: c.volume * 3.0,
                ..c
            }
        })
        .collect()
}

#[test]
fn evaluating_a_prefix_ignores_later_candles() {
    // 400 H1 execution candles from t0; 350 H4 candles ending together with
    // them, so 250 H4 candles close at or before t0.
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let htf_start = t0 - Duration::hours(1000);
    let exec_candles = walk(Timeframe::H1, t0, 400);
    let htf_candles = walk(Timeframe::H4, htf_start, 350);
    let evaluator = Evaluator::new(EvaluatorConfig::default()).unwrap();

    for len in [252, 300, 348] {
        let htf_len = 250 + len / 4;

        let exec = CandleSeries::new(Timeframe::H1, exec_candles.clone()).unwrap();
        let htf = CandleSeries::new(Timeframe::H4, htf_candles.clone()).unwrap();
        let exec_alt =
            CandleSeries::new(Timeframe::H1, rewrite_after(&exec_candles, len)).unwrap();
        let htf_alt =
            CandleSeries::new(Timeframe::H4, rewrite_after(&htf_candles, htf_len)).unwrap();

        // The two datasets really do differ after the cut.
        assert_ne!(
            DatasetHash::of_snapshot(&Snapshot::new(htf.clone(), exec.clone())),
            DatasetHash::of_snapshot(&Snapshot::new(htf_alt.clone(), exec_alt.clone())),
        );

        let cut = Snapshot::new(htf.prefix(htf_len).unwrap(), exec.prefix(len).unwrap());
        let cut_alt = Snapshot::new(
            htf_alt.prefix(htf_len).unwrap(),
            exec_alt.prefix(len).unwrap(),
        );
        assert_eq!(cut.htf.last_close_time(), cut.execution.last_close_time());

        let a = evaluator.evaluate(&cut).unwrap();
        let b = evaluator.evaluate(&cut_alt).unwrap();
        assert_eq!(a, b, "cut at {len}");
        assert_eq!(a.fingerprint(), b.fingerprint(), "cut at {len}");
        assert_eq!(DatasetHash::of_snapshot(&cut), DatasetHash::of_snapshot(&cut_alt));
    }
}

#[test]
fn htf_candle_closing_after_the_cut_is_refused() {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let exec = CandleSeries::new(Timeframe::H1, walk(Timeframe::H1, t0, 400)).unwrap();
    let htf = CandleSeries::new(
        Timeframe::H4,
        walk(Timeframe::H4, t0 - Duration::hours(1000), 350),
    )
    .unwrap();
    let evaluator = Evaluator::new(EvaluatorConfig::default()).unwrap();

    // Cutting execution at 298 leaves the H4 candle opened at +296h still open.
    let snap = Snapshot::new(htf.prefix(250 + 75).unwrap(), exec.prefix(298).unwrap());
    assert!(matches!(
        evaluator.evaluate(&snap),
        Err(DataError::HtfAhead { .. })
    ));
    let snap = Snapshot::new(htf.prefix(250 + 74).unwrap(), exec.prefix(298).unwrap());
    assert!(evaluator.evaluate(&snap).is_ok());
}
