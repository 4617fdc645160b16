//! Universe scans: fetch, evaluate and notify for every symbol in parallel.
//!
//! A scan is driven by a [`ScanConfig`] (TOML). Each symbol gets its own
//! evaluator, built once when the [`Scanner`] is constructed, so configuration
//! errors surface before any candle is fetched. Symbols are independent and
//! run on the rayon pool; the [`InFlightGuard`] keeps overlapping scans from
//! processing the same symbol twice.
//!
//! Every snapshot is evaluated against a clock: the configured `as_of`, or the
//! wall clock at fetch time. A source whose last candle has not closed by then
//! is reported as a data error instead of being scored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use zonelab_core::domain::{Snapshot, Timeframe};
use zonelab_core::fingerprint::{ConfigHash, DatasetHash};
use zonelab_core::{
    AssetProfile, ChopPolicy, ConfigError, DataError, Evaluator, EvaluatorConfig, Signal,
};

use crate::circuit_breaker::CircuitBreaker;
use crate::csv_source::CsvProvider;
use crate::inflight::InFlightGuard;
use crate::notify::NotificationSink;
use crate::provider::{CandleProvider, FetchError};
use crate::retry::{RetryPolicy, RetryingProvider};
use crate::synthetic::SyntheticProvider;

/// Where candles come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    Csv { dir: PathBuf },
    Synthetic { seed: u64, len: usize },
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Synthetic { seed: 42, len: 500 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    pub cooldown_secs: u64,
    pub failure_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 300,
            failure_threshold: 3,
        }
    }
}

/// Evaluator selection for a scan.
///
/// With `config_file` set, every symbol starts from that file; otherwise from
/// its asset profile (`profiles[symbol]`, falling back to `profile`). The
/// overrides and the scan's timeframes are applied last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorSection {
    pub profile: AssetProfile,
    pub profiles: BTreeMap<String, AssetProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chop_policy: Option<ChopPolicy>,
}

impl Default for EvaluatorSection {
    fn default() -> Self {
        Self {
            profile: AssetProfile::Default,
            profiles: BTreeMap::new(),
            config_file: None,
            min_score: None,
            chop_policy: None,
        }
    }
}

/// Serializable scan configuration.
///
/// ```toml
/// universe = ["BTCUSDT", "ETHUSDT"]
/// htf_timeframe = "4h"
/// execution_timeframe = "1h"
/// as_of = "2024-06-01T00:00:00Z"
///
/// [source]
/// type = "csv"
/// dir = "data"
///
/// [evaluator]
/// profile = "major"
/// chop_policy = "penalize"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub universe: Vec<String>,
    pub htf_timeframe: Timeframe,
    pub execution_timeframe: Timeframe,
    pub source: SourceConfig,
    pub retry: RetryPolicy,
    pub breaker: BreakerConfig,
    pub evaluator: EvaluatorSection,
    /// Evaluate symbols on the rayon pool.
    pub parallel: bool,
    /// Fixed evaluation clock. Unset means the wall clock at fetch time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            universe: Vec::new(),
            htf_timeframe: Timeframe::H4,
            execution_timeframe: Timeframe::H1,
            source: SourceConfig::default(),
            retry: RetryPolicy::default(),
            breaker: BreakerConfig::default(),
            evaluator: EvaluatorSection::default(),
            parallel: true,
            as_of: None,
        }
    }
}

impl ScanConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ScanError> {
        let config: Self =
            toml::from_str(s).map_err(|e| ScanError::Config(ConfigError::Parse(e.to_string())))?;
        if config.universe.is_empty() {
            return Err(ScanError::EmptyUniverse);
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ScanError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ScanError::Config(ConfigError::Io(format!("{}: {e}", path.display())))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn profile_for(&self, symbol: &str) -> AssetProfile {
        self.evaluator
            .profiles
            .get(symbol)
            .copied()
            .unwrap_or(self.evaluator.profile)
    }

    /// Fully resolved, validated evaluator configuration for one symbol.
    pub fn evaluator_config_for(&self, symbol: &str) -> Result<EvaluatorConfig, ConfigError> {
        let mut config = match &self.evaluator.config_file {
            Some(path) => EvaluatorConfig::from_file(path)?,
            None => self.profile_for(symbol).config(),
        };
        config.htf_timeframe = Some(self.htf_timeframe);
        config.execution_timeframe = Some(self.execution_timeframe);
        if let Some(min_score) = self.evaluator.min_score {
            config.score.min_score = min_score;
        }
        if let Some(policy) = self.evaluator.chop_policy {
            config.regime.policy = policy;
        }
        config.validate()?;
        Ok(config)
    }

    /// The configured candle source behind retry and a shared circuit breaker.
    pub fn build_provider(&self) -> RetryingProvider<Box<dyn CandleProvider>> {
        let inner: Box<dyn CandleProvider> = match &self.source {
            SourceConfig::Csv { dir } => Box::new(CsvProvider::new(dir.clone())),
            SourceConfig::Synthetic { seed, len } => {
                Box::new(SyntheticProvider::with_default_anchor(*seed, *len))
            }
        };
        let breaker = Arc::new(CircuitBreaker::new(
            Duration::from_secs(self.breaker.cooldown_secs),
            self.breaker.failure_threshold,
        ));
        RetryingProvider::new(inner, self.retry.clone(), breaker)
    }
}

/// Why one symbol produced no signal.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan universe is empty")]
    EmptyUniverse,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("evaluator config for {symbol}: {source}")]
    SymbolConfig {
        symbol: String,
        #[source]
        source: ConfigError,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("invalid snapshot for {symbol}: {source}")]
    Data {
        symbol: String,
        #[source]
        source: DataError,
    },

    #[error("{0} is already being evaluated")]
    AlreadyInFlight(String),

    #[error("{0} is not in the scan universe")]
    UnknownSymbol(String),
}

/// A signal tied to the exact configuration and data that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub symbol: String,
    pub signal: Signal,
    pub config_hash: ConfigHash,
    pub dataset_hash: DatasetHash,
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub symbol: String,
    pub result: Result<ScanReport, ScanError>,
}

/// Results of one pass over the universe, in universe order.
#[derive(Debug, Default)]
pub struct ScanSummary {
    pub outcomes: Vec<ScanOutcome>,
}

impl ScanSummary {
    pub fn reports(&self) -> impl Iterator<Item = &ScanReport> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn trades(&self) -> impl Iterator<Item = &ScanReport> {
        self.reports().filter(|r| r.signal.is_trade())
    }

    pub fn trade_count(&self) -> usize {
        self.trades().count()
    }

    pub fn error_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }
}

/// Evaluates a fixed universe against one provider.
pub struct Scanner<P> {
    provider: P,
    evaluators: BTreeMap<String, Evaluator>,
    universe: Vec<String>,
    htf_timeframe: Timeframe,
    execution_timeframe: Timeframe,
    parallel: bool,
    as_of: Option<DateTime<Utc>>,
    guard: InFlightGuard,
}

impl<P: CandleProvider> Scanner<P> {
    /// Build one evaluator per symbol. Fails on the first invalid config.
    pub fn new(config: &ScanConfig, provider: P) -> Result<Self, ScanError> {
        if config.universe.is_empty() {
            return Err(ScanError::EmptyUniverse);
        }
        let mut evaluators = BTreeMap::new();
        for symbol in &config.universe {
            let evaluator = config
                .evaluator_config_for(symbol)
                .and_then(Evaluator::new)
                .map_err(|source| ScanError::SymbolConfig {
                    symbol: symbol.clone(),
                    source,
                })?;
            debug!(symbol = %symbol, config = %evaluator.config_hash().short(), "evaluator ready");
            evaluators.insert(symbol.clone(), evaluator);
        }
        Ok(Self {
            provider,
            evaluators,
            universe: config.universe.clone(),
            htf_timeframe: config.htf_timeframe,
            execution_timeframe: config.execution_timeframe,
            parallel: config.parallel,
            as_of: config.as_of,
            guard: InFlightGuard::new(),
        })
    }

    /// Share an in-flight registry with other scanners.
    pub fn with_guard(mut self, guard: InFlightGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Evaluate against a fixed clock instead of the configured one.
    pub fn with_clock(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn guard(&self) -> &InFlightGuard {
        &self.guard
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn universe(&self) -> &[String] {
        &self.universe
    }

    pub fn evaluator(&self, symbol: &str) -> Option<&Evaluator> {
        self.evaluators.get(symbol)
    }

    /// One evaluate-and-notify cycle for `symbol`.
    pub fn scan_symbol(
        &self,
        symbol: &str,
        sink: &dyn NotificationSink,
    ) -> Result<ScanReport, ScanError> {
        let evaluator = self
            .evaluators
            .get(symbol)
            .ok_or_else(|| ScanError::UnknownSymbol(symbol.to_string()))?;
        let _permit = self
            .guard
            .try_acquire(symbol)
            .ok_or_else(|| ScanError::AlreadyInFlight(symbol.to_string()))?;

        let htf = self.provider.fetch(symbol, self.htf_timeframe)?;
        let execution = self.provider.fetch(symbol, self.execution_timeframe)?;
        let as_of = self.as_of.unwrap_or_else(Utc::now);
        let snapshot = Snapshot::new(htf, execution).with_clock(as_of);

        let signal = evaluator
            .evaluate(&snapshot)
            .map_err(|source| ScanError::Data {
                symbol: symbol.to_string(),
                source,
            })?;
        sink.notify(symbol, &signal);

        Ok(ScanReport {
            symbol: symbol.to_string(),
            signal,
            config_hash: evaluator.config_hash().clone(),
            dataset_hash: DatasetHash::of_snapshot(&snapshot),
        })
    }

    /// Scan the whole universe. Per-symbol failures are collected, never fatal.
    pub fn scan(&self, sink: &dyn NotificationSink) -> ScanSummary {
        let run = |symbol: &String| {
            let result = self.scan_symbol(symbol, sink);
            if let Err(err) = &result {
                warn!(symbol = %symbol, error = %err, "symbol skipped");
            }
            ScanOutcome {
                symbol: symbol.clone(),
                result,
            }
        };

        let outcomes: Vec<ScanOutcome> = if self.parallel {
            self.universe.par_iter().map(run).collect()
        } else {
            self.universe.iter().map(run).collect()
        };

        let summary = ScanSummary { outcomes };
        info!(
            provider = self.provider.name(),
            symbols = summary.outcomes.len(),
            trades = summary.trade_count(),
            errors = summary.error_count(),
            "scan complete"
        );
        summary
    }
}
