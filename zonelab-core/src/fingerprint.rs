//! Content fingerprints: deterministic identification of configurations,
//! input snapshots and decisions.
//!
//! - `ConfigHash`: exact identity of an `EvaluatorConfig` (every parameter).
//! - `DatasetHash`: identity of the candle data an evaluation saw.
//! - `SignalHash`: identity of a produced `Signal`. Two evaluations of the same
//!   snapshot under the same config must produce equal `SignalHash` values.
//!
//! All hashes are BLAKE3 over canonical `serde_json` output; struct field order
//! is fixed by the derive, so the JSON is deterministic.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{CandleSeries, Snapshot};

fn hash_json<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_vec(value) {
        Ok(bytes) => blake3::hash(&bytes).to_hex().to_string(),
        // Plain data with string keys; serialization cannot fail.
        Err(_) => blake3::hash(&[]).to_hex().to_string(),
    }
}

/// Deterministic configuration hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn of<T: Serialize>(config: &T) -> Self {
        Self(hash_json(config))
    }

    /// First 12 hex characters, for log lines and rendered messages.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic hash of the candle data in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn of_series(series: &CandleSeries) -> Self {
        Self(hash_json(series))
    }

    pub fn of_snapshot(snapshot: &Snapshot) -> Self {
        let mut hasher = blake3::Hasher::new();
        for series in [&snapshot.htf, &snapshot.execution] {
            hasher.update(Self::of_series(series).0.as_bytes());
        }
        if let Some(forming) = &snapshot.forming {
            hasher.update(hash_json(forming).as_bytes());
        }
        if let Some(as_of) = snapshot.as_of {
            hasher.update(&as_of.timestamp_millis().to_le_bytes());
        }
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic hash of an evaluation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalHash(pub String);

impl SignalHash {
    pub fn of<T: Serialize>(signal: &T) -> Self {
        Self(hash_json(signal))
    }
}

impl fmt::Display for SignalHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candle, Timeframe};
    use chrono::{Duration, TimeZone, Utc};

    fn series(close: f64) -> CandleSeries {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let candles = (0..3)
            .map(|i| Candle {
                open_time: t0 + Duration::hours(i),
                open: 10.0,
                high: 12.0,
                low: 9.0,
                close,
                volume: 10.0,
            })
            .collect();
        CandleSeries::new(Timeframe::H1, candles).unwrap()
    }

    #[test]
    fn dataset_hash_is_deterministic() {
        assert_eq!(
            DatasetHash::of_series(&series(11.0)),
            DatasetHash::of_series(&series(11.0))
        );
    }

    #[test]
    fn dataset_hash_changes_with_data() {
        assert_ne!(
            DatasetHash::of_series(&series(11.0)),
            DatasetHash::of_series(&series(11.5))
        );
    }

    #[test]
    fn snapshot_hash_includes_clock() {
        let snap = Snapshot::new(series(11.0), series(11.0));
        let later = snap.clone().with_clock(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_ne!(DatasetHash::of_snapshot(&snap), DatasetHash::of_snapshot(&later));
    }

    #[test]
    fn config_hash_short_prefix() {
        let h = ConfigHash::of(&serde_json::json!({"a": 1}));
        assert_eq!(h.short().len(), 12);
        assert!(h.0.starts_with(h.short()));
    }
}
