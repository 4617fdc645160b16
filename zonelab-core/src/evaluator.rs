//! The fixed-order decision pipeline.
//!
//! validate → length gate → trend → zone → regime → retest → risk → stop
//! breach → score. Each stage either feeds the next or ends the evaluation
//! with a `NO_TRADE` reason. No stage runs twice and nothing is retried.

use tracing::{debug, trace};

use crate::components::{
    RegimeFilter, RetestValidator, RiskCalculator, TrendClassifier, TrendError, ZoneDetector,
};
use crate::config::{ChopPolicy, EvaluatorConfig, RegimeSource};
use crate::domain::{CandleSeries, Snapshot, Timeframe};
use crate::error::{ConfigError, DataError};
use crate::fingerprint::ConfigHash;
use crate::indicators::{Atr, Indicator};
use crate::scoring::{ScoreInputs, SignalScorer};
use crate::signal::{Decision, ReasonCode, Signal, SignalTier};

/// One configured evaluation context. Immutable after construction and safe
/// to share across threads.
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: EvaluatorConfig,
    config_hash: ConfigHash,
    atr: Atr,
    trend: TrendClassifier,
    zone: ZoneDetector,
    retest: RetestValidator,
    regime: RegimeFilter,
    risk: RiskCalculator,
    scorer: SignalScorer,
}

impl Evaluator {
    pub fn new(config: EvaluatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config_hash: config.fingerprint(),
            atr: Atr::new(config.atr_period),
            trend: TrendClassifier::new(&config.trend),
            zone: ZoneDetector::new(&config.zone, config.atr_period),
            retest: RetestValidator::new(&config.retest),
            regime: RegimeFilter::new(&config.regime),
            risk: RiskCalculator::new(&config.risk),
            scorer: SignalScorer::new(&config.score, config.regime.policy),
            config,
        })
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn config_hash(&self) -> &ConfigHash {
        &self.config_hash
    }

    /// Evaluate one snapshot.
    ///
    /// Structural input defects are errors; every other outcome, including
    /// series too short to analyse, is a [`Signal`].
    pub fn evaluate(&self, snapshot: &Snapshot) -> Result<Signal, DataError> {
        check_timeframe("htf", self.config.htf_timeframe, &snapshot.htf)?;
        check_timeframe("execution", self.config.execution_timeframe, &snapshot.execution)?;
        snapshot.validate()?;

        let htf_len = snapshot.htf.len();
        let exec_len = snapshot.execution.len();
        if htf_len < self.config.min_htf_len() || exec_len < self.config.min_execution_len() {
            debug!(
                htf_len,
                exec_len,
                htf_needed = self.config.min_htf_len(),
                exec_needed = self.config.min_execution_len(),
                "series too short"
            );
            return Ok(stop(Signal::no_trade(ReasonCode::InsufficientData)));
        }

        let mut signal = Signal::no_trade(ReasonCode::Qualified);

        // 1. Trend on the higher timeframe.
        let trend = match self.trend.classify(&snapshot.htf.closes()) {
            Ok(state) => state,
            Err(TrendError::InsufficientData { needed, got }) => {
                debug!(needed, got, "trend classifier lacks data");
                return Ok(stop(Signal::no_trade(ReasonCode::InsufficientData)));
            }
        };
        trace!(direction = ?trend.direction, layers = trend.evidence_layers, "trend classified");
        let direction = trend.direction();
        signal.trend = Some(trend.clone());
        let Some(direction) = direction else {
            signal.reason = ReasonCode::TrendInvalid;
            return Ok(stop(signal));
        };
        signal.direction = Some(direction);

        // 2. Displacement zone on the execution timeframe.
        let candles = snapshot.execution.candles();
        let exec_atr = self.atr.compute(candles);
        let Some(zone) = self.zone.detect(candles, &exec_atr, direction) else {
            signal.reason = ReasonCode::NoZone;
            return Ok(stop(signal));
        };
        trace!(
            min = zone.min,
            max = zone.max,
            origin = zone.origin_index,
            strength = zone.strength,
            "zone detected"
        );
        signal.zone = Some(zone);

        // 3. Regime.
        let regime = match self.config.regime.source {
            RegimeSource::Execution => self.regime.evaluate(candles, &exec_atr),
            RegimeSource::HigherTimeframe => {
                let htf = snapshot.htf.candles();
                self.regime.evaluate(htf, &self.atr.compute(htf))
            }
        };
        trace!(chop = regime.chop, votes = regime.score, "regime measured");
        signal.regime = Some(regime);
        if regime.chop && self.config.regime.policy == ChopPolicy::Suppress {
            signal.reason = ReasonCode::RegimeChop;
            return Ok(stop(signal));
        }

        // 4. Retest is evidence, not a gate.
        let retest = self.retest.validate(&zone, candles, direction);
        signal.retest = retest;

        // 5. Risk from the ATR at the last closed candle.
        let last_atr = exec_atr.last().copied().unwrap_or(f64::NAN);
        let Some(risk) = self.risk.calculate(&zone, direction, last_atr, retest.as_ref()) else {
            signal.reason = ReasonCode::RiskUnavailable;
            return Ok(stop(signal));
        };
        signal.risk = Some(risk);

        if let Some(forming) = &snapshot.forming {
            if risk.is_breached_by(forming, direction) {
                signal.reason = ReasonCode::StopBreached;
                return Ok(stop(signal));
            }
        }

        // 6. Score.
        let compression = self.regime.compression(&exec_atr, zone.origin_index);
        let breakdown = self.scorer.score(&ScoreInputs {
            trend: &trend,
            zone: &zone,
            retest: retest.as_ref(),
            regime: &regime,
            compression,
        });
        signal.score = breakdown.total;
        signal.breakdown = breakdown;

        if breakdown.total < self.scorer.min_score() {
            signal.reason = ReasonCode::LowScore;
            return Ok(stop(signal));
        }

        signal.decision = Decision::Trade;
        signal.tier = Some(SignalTier::from_score(breakdown.total));
        debug!(
            direction = %direction,
            score = breakdown.total,
            entry = risk.entry,
            stop_loss = risk.stop_loss,
            "signal qualified"
        );
        Ok(signal)
    }
}

fn check_timeframe(
    series: &'static str,
    expected: Option<Timeframe>,
    actual: &CandleSeries,
) -> Result<(), DataError> {
    match expected {
        Some(expected) if expected != actual.timeframe() => Err(DataError::TimeframeMismatch {
            series,
            expected,
            actual: actual.timeframe(),
        }),
        _ => Ok(()),
    }
}

fn stop(signal: Signal) -> Signal {
    debug!(reason = %signal.reason, score = signal.score, "no trade");
    signal
}
