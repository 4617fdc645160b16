//! ZoneLab Core — deterministic trade-signal evaluation over candle data.
//!
//! This crate contains the whole decision pipeline:
//! - Domain types (timeframes, candles, validated series, snapshots)
//! - Indicators (true range, Wilder ATR, EMA, SMA, trailing means)
//! - Components: trend classifier, displacement-zone detector, retest
//!   validator, regime (chop) filter, risk calculator
//! - Signal scorer and the fixed-order `Evaluator` state machine
//! - Immutable, validated configuration with per-asset profiles
//! - Content fingerprints for configs, datasets and signals
//!
//! The evaluator is a pure function of `(Snapshot, EvaluatorConfig)`: no I/O,
//! no clock reads, no shared mutable state.

pub mod components;
pub mod config;
pub mod domain;
pub mod error;
pub mod evaluator;
pub mod fingerprint;
pub mod indicators;
pub mod scoring;
pub mod signal;

pub use config::{AssetProfile, ChopPolicy, EntryMode, EvaluatorConfig, RegimeSource};
pub use error::{ConfigError, DataError};
pub use evaluator::Evaluator;
pub use signal::{Decision, ReasonCode, ScoreBreakdown, Signal, SignalTier};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a runner thread touches is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::CandleSeries>();
        require_sync::<domain::CandleSeries>();
        require_send::<domain::Snapshot>();
        require_sync::<domain::Snapshot>();

        // Pipeline
        require_send::<Evaluator>();
        require_sync::<Evaluator>();
        require_send::<EvaluatorConfig>();
        require_sync::<EvaluatorConfig>();
        require_send::<Signal>();
        require_sync::<Signal>();

        // Components
        require_send::<components::TrendClassifier>();
        require_sync::<components::TrendClassifier>();
        require_send::<components::ZoneDetector>();
        require_sync::<components::ZoneDetector>();
        require_send::<components::RetestValidator>();
        require_sync::<components::RetestValidator>();
        require_send::<components::RegimeFilter>();
        require_sync::<components::RegimeFilter>();
        require_send::<components::RiskCalculator>();
        require_sync::<components::RiskCalculator>();

        // Errors and fingerprints
        require_send::<DataError>();
        require_sync::<DataError>();
        require_send::<fingerprint::ConfigHash>();
        require_sync::<fingerprint::ConfigHash>();
        require_send::<fingerprint::SignalHash>();
        require_sync::<fingerprint::SignalHash>();
    }

    /// Architecture contract: the evaluator takes the snapshot by shared
    /// reference and cannot mutate it.
    #[test]
    fn evaluate_borrows_snapshot_immutably() {
        fn _check(eval: &Evaluator, snap: &domain::Snapshot) -> Result<Signal, DataError> {
            eval.evaluate(snap)
        }
    }
}
