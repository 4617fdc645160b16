//! Immutable evaluator configuration.
//!
//! One `EvaluatorConfig` describes one asset's evaluation context. Per-asset
//! variation (volume multiplier, zone padding, retest lookback) is expressed
//! through [`AssetProfile`] presets and the [`EvaluatorConfigBuilder`], never
//! through separate pipeline copies. A config is validated once, at
//! construction; the evaluator never re-checks it per call.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::domain::Timeframe;
use crate::error::ConfigError;
use crate::fingerprint::ConfigHash;

/// Which series the regime (chop) filter reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeSource {
    Execution,
    HigherTimeframe,
}

/// What detected chop does to a candidate signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChopPolicy {
    /// Chop is a hard gate: `NO_TRADE` with `REGIME_CHOP`.
    Suppress,
    /// Chop only subtracts `weight_chop_penalty` from the score.
    Penalize,
}

/// How the entry price for risk projection is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryMode {
    /// Enter at the zone midpoint.
    ZoneMidpoint,
    /// Enter at the close of the confirming retest candle; midpoint when there
    /// is no confirmed retest.
    RetestClose,
}

/// Trend classifier parameters (higher timeframe).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendParams {
    /// Strictly ascending EMA periods; the first is the "fast" average.
    pub ma_periods: Vec<usize>,
    /// Number of trailing closes that must be strictly monotonic.
    pub structure_lookback: usize,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            ma_periods: vec![20, 50, 200],
            structure_lookback: 3,
        }
    }
}

impl TrendParams {
    pub fn longest_period(&self) -> usize {
        self.ma_periods.iter().copied().max().unwrap_or(0)
    }
}

/// Displacement-zone detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneParams {
    /// k₁: body must exceed this multiple of ATR.
    pub displacement_body_atr: f64,
    /// k₂: volume must reach this multiple of the trailing average volume.
    pub volume_multiplier: f64,
    /// Maximum number of closed candles scanned backward.
    pub lookback: usize,
    /// ATR fraction added on the continuation side of the zone.
    pub pad_continuation_atr: f64,
    /// ATR fraction added on the invalidation side of the zone.
    pub pad_invalidation_atr: f64,
    /// Minimum body/ATR strength for a zone to be kept.
    pub min_strength: f64,
}

impl Default for ZoneParams {
    fn default() -> Self {
        Self {
            displacement_body_atr: 1.5,
            volume_multiplier: 1.5,
            lookback: 50,
            pad_continuation_atr: 0.25,
            pad_invalidation_atr: 0.1,
            min_strength: 1.5,
        }
    }
}

/// Retest/rejection validator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetestParams {
    /// Only the most recent `lookback` closed candles are examined.
    pub lookback: usize,
    /// Rejecting wick must exceed this fraction of the candle range.
    pub wick_ratio: f64,
}

impl Default for RetestParams {
    fn default() -> Self {
        Self {
            lookback: 5,
            wick_ratio: 0.4,
        }
    }
}

/// Regime (chop) filter parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeParams {
    pub source: RegimeSource,
    pub policy: ChopPolicy,
    /// Trailing window length, in candles.
    pub window: usize,
    /// Condition 1: mean body < ratio × mean ATR.
    pub body_atr_ratio: f64,
    /// Condition 2: |net move| < ratio × mean ATR × window.
    pub net_move_ratio: f64,
    /// Condition 3: a pair "overlaps" when its shared range > frac × mean ATR.
    pub overlap_atr_frac: f64,
    /// Condition 3: minimum number of overlapping consecutive pairs.
    pub min_overlap_pairs: usize,
    /// Condition 4: mean volume < ratio × baseline volume.
    pub low_volume_ratio: f64,
    /// Length of the longer-horizon volume (and ATR) baseline, in candles.
    pub volume_baseline: usize,
    /// Volatility compression holds when pre-origin ATR / baseline ATR < this.
    pub compression_ratio: f64,
}

impl Default for RegimeParams {
    fn default() -> Self {
        Self {
            source: RegimeSource::Execution,
            policy: ChopPolicy::Suppress,
            window: 8,
            body_atr_ratio: 0.35,
            net_move_ratio: 0.15,
            overlap_atr_frac: 0.1,
            min_overlap_pairs: 6,
            low_volume_ratio: 0.7,
            volume_baseline: 50,
            compression_ratio: 0.8,
        }
    }
}

/// Risk projection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskParams {
    /// Stop sits this many ATRs beyond the zone's invalidation edge.
    pub stop_buffer_atr: f64,
    /// Take-profit distances as multiples of the risk distance.
    pub take_profit_multiples: [f64; 3],
    pub entry_mode: EntryMode,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            stop_buffer_atr: 0.1,
            take_profit_multiples: [1.0, 2.0, 3.0],
            entry_mode: EntryMode::ZoneMidpoint,
        }
    }
}

/// Score weights and the trade gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreParams {
    pub weight_trend: f64,
    pub weight_zone: f64,
    pub weight_retest: f64,
    pub weight_compression: f64,
    pub weight_chop_penalty: f64,
    /// Zone strength at which the zone-quality component saturates.
    pub zone_strength_full: f64,
    pub min_score: f64,
}

impl Default for ScoreParams {
    fn default() -> Self {
        Self {
            weight_trend: 40.0,
            weight_zone: 20.0,
            weight_retest: 25.0,
            weight_compression: 15.0,
            weight_chop_penalty: 30.0,
            zone_strength_full: 3.0,
            min_score: 60.0,
        }
    }
}

/// Complete evaluator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Expected timeframe of the higher-timeframe series (unchecked when `None`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub htf_timeframe: Option<Timeframe>,
    /// Expected timeframe of the execution series (unchecked when `None`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_timeframe: Option<Timeframe>,
    pub atr_period: usize,
    pub trend: TrendParams,
    pub zone: ZoneParams,
    pub retest: RetestParams,
    pub regime: RegimeParams,
    pub risk: RiskParams,
    pub score: ScoreParams,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            htf_timeframe: None,
            execution_timeframe: None,
            atr_period: 14,
            trend: TrendParams::default(),
            zone: ZoneParams::default(),
            retest: RetestParams::default(),
            regime: RegimeParams::default(),
            risk: RiskParams::default(),
            score: ScoreParams::default(),
        }
    }
}

fn check(ok: bool, field: &'static str, reason: &str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, reason))
    }
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

impl EvaluatorConfig {
    pub fn builder() -> EvaluatorConfigBuilder {
        EvaluatorConfigBuilder::new()
    }

    pub fn for_profile(profile: AssetProfile) -> Self {
        profile.config()
    }

    /// Check every invariant the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check(self.atr_period >= 1, "atr_period", "must be >= 1")?;

        let t = &self.trend;
        check(!t.ma_periods.is_empty(), "trend.ma_periods", "must not be empty")?;
        check(
            t.ma_periods.iter().all(|&p| p >= 1),
            "trend.ma_periods",
            "every period must be >= 1",
        )?;
        check(
            t.ma_periods.windows(2).all(|w| w[0] < w[1]),
            "trend.ma_periods",
            "periods must be strictly ascending",
        )?;
        check(
            t.structure_lookback >= 2,
            "trend.structure_lookback",
            "must be >= 2",
        )?;
        check(
            t.structure_lookback <= t.longest_period(),
            "trend.structure_lookback",
            "must not exceed the longest moving-average period",
        )?;

        let z = &self.zone;
        check(
            positive(z.displacement_body_atr),
            "zone.displacement_body_atr",
            "must be > 0",
        )?;
        check(
            positive(z.volume_multiplier),
            "zone.volume_multiplier",
            "must be > 0",
        )?;
        check(z.lookback >= 1, "zone.lookback", "must be >= 1")?;
        check(
            non_negative(z.pad_continuation_atr),
            "zone.pad_continuation_atr",
            "must be >= 0",
        )?;
        check(
            non_negative(z.pad_invalidation_atr),
            "zone.pad_invalidation_atr",
            "must be >= 0",
        )?;
        check(
            z.pad_continuation_atr >= z.pad_invalidation_atr,
            "zone.pad_continuation_atr",
            "continuation padding must be at least the invalidation padding",
        )?;
        check(
            non_negative(z.min_strength),
            "zone.min_strength",
            "must be >= 0",
        )?;

        let r = &self.retest;
        check(r.lookback >= 1, "retest.lookback", "must be >= 1")?;
        check(
            r.wick_ratio.is_finite() && r.wick_ratio > 0.0 && r.wick_ratio < 1.0,
            "retest.wick_ratio",
            "must be in (0, 1)",
        )?;

        let g = &self.regime;
        check(g.window >= 2, "regime.window", "must be >= 2")?;
        check(positive(g.body_atr_ratio), "regime.body_atr_ratio", "must be > 0")?;
        check(positive(g.net_move_ratio), "regime.net_move_ratio", "must be > 0")?;
        check(
            non_negative(g.overlap_atr_frac),
            "regime.overlap_atr_frac",
            "must be >= 0",
        )?;
        check(
            g.min_overlap_pairs >= 1 && g.min_overlap_pairs < g.window,
            "regime.min_overlap_pairs",
            "must be in [1, window - 1]",
        )?;
        check(
            positive(g.low_volume_ratio),
            "regime.low_volume_ratio",
            "must be > 0",
        )?;
        check(
            g.volume_baseline >= g.window,
            "regime.volume_baseline",
            "must be >= regime.window",
        )?;
        check(
            positive(g.compression_ratio),
            "regime.compression_ratio",
            "must be > 0",
        )?;

        let k = &self.risk;
        check(
            non_negative(k.stop_buffer_atr),
            "risk.stop_buffer_atr",
            "must be >= 0",
        )?;
        check(
            k.take_profit_multiples.iter().all(|&m| positive(m)),
            "risk.take_profit_multiples",
            "every multiple must be > 0",
        )?;
        check(
            k.take_profit_multiples.windows(2).all(|w| w[0] < w[1]),
            "risk.take_profit_multiples",
            "multiples must be strictly ascending",
        )?;

        let s = &self.score;
        for (field, w) in [
            ("score.weight_trend", s.weight_trend),
            ("score.weight_zone", s.weight_zone),
            ("score.weight_retest", s.weight_retest),
            ("score.weight_compression", s.weight_compression),
            ("score.weight_chop_penalty", s.weight_chop_penalty),
        ] {
            check(non_negative(w), field, "must be >= 0")?;
        }
        check(
            positive(s.zone_strength_full),
            "score.zone_strength_full",
            "must be > 0",
        )?;
        check(
            s.min_score.is_finite() && (0.0..=100.0).contains(&s.min_score),
            "score.min_score",
            "must be in [0, 100]",
        )?;

        Ok(())
    }

    /// Candles the higher-timeframe series needs before any stage can run.
    pub fn min_htf_len(&self) -> usize {
        let trend = self.trend.longest_period();
        match self.regime.source {
            RegimeSource::Execution => trend,
            RegimeSource::HigherTimeframe => trend.max(self.regime_len()),
        }
    }

    /// Candles the execution series needs before any stage can run.
    pub fn min_execution_len(&self) -> usize {
        // Zone scan: ATR at the candle before the candidate plus the candidate
        // plus the excluded most recent candle.
        let zone = self.atr_period + 2;
        match self.regime.source {
            RegimeSource::Execution => zone.max(self.regime_len()),
            RegimeSource::HigherTimeframe => zone,
        }
    }

    fn regime_len(&self) -> usize {
        (self.regime.window + self.atr_period).max(self.regime.volume_baseline)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Content hash of the full parameter set.
    pub fn fingerprint(&self) -> ConfigHash {
        ConfigHash::of(self)
    }
}

/// Named per-asset parameter presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetProfile {
    Default,
    /// Deep, liquid books (BTC, ETH): displacement shows with less volume.
    Major,
    /// Thin books: demand more volume, pad zones wider, retest sooner.
    Altcoin,
    /// Index/FX-like instruments: tight zones, slower retests.
    Index,
}

impl AssetProfile {
    pub const ALL: [AssetProfile; 4] = [Self::Default, Self::Major, Self::Altcoin, Self::Index];

    pub fn config(self) -> EvaluatorConfig {
        let mut config = EvaluatorConfig::default();
        match self {
            Self::Default => {}
            Self::Major => {
                config.zone.volume_multiplier = 1.3;
                config.zone.pad_continuation_atr = 0.2;
                config.zone.pad_invalidation_atr = 0.08;
                config.retest.lookback = 6;
            }
            Self::Altcoin => {
                config.zone.volume_multiplier = 2.0;
                config.zone.pad_continuation_atr = 0.35;
                config.zone.pad_invalidation_atr = 0.15;
                config.retest.lookback = 4;
            }
            Self::Index => {
                config.zone.volume_multiplier = 1.2;
                config.zone.pad_continuation_atr = 0.15;
                config.zone.pad_invalidation_atr = 0.05;
                config.retest.lookback = 8;
            }
        }
        config
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Major => "major",
            Self::Altcoin => "altcoin",
            Self::Index => "index",
        }
    }
}

impl FromStr for AssetProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnknownProfile(s.to_string()))
    }
}

/// Builder over [`EvaluatorConfig`]; `build()` validates.
#[derive(Debug, Clone)]
pub struct EvaluatorConfigBuilder {
    config: EvaluatorConfig,
}

impl Default for EvaluatorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluatorConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EvaluatorConfig::default(),
        }
    }

    pub fn from_profile(profile: AssetProfile) -> Self {
        Self {
            config: profile.config(),
        }
    }

    pub fn timeframes(mut self, htf: Timeframe, execution: Timeframe) -> Self {
        self.config.htf_timeframe = Some(htf);
        self.config.execution_timeframe = Some(execution);
        self
    }

    pub fn atr_period(mut self, period: usize) -> Self {
        self.config.atr_period = period;
        self
    }

    pub fn ma_periods(mut self, periods: impl Into<Vec<usize>>) -> Self {
        self.config.trend.ma_periods = periods.into();
        self
    }

    pub fn structure_lookback(mut self, lookback: usize) -> Self {
        self.config.trend.structure_lookback = lookback;
        self
    }

    pub fn displacement_body_atr(mut self, k1: f64) -> Self {
        self.config.zone.displacement_body_atr = k1;
        self
    }

    pub fn volume_multiplier(mut self, k2: f64) -> Self {
        self.config.zone.volume_multiplier = k2;
        self
    }

    pub fn zone_lookback(mut self, lookback: usize) -> Self {
        self.config.zone.lookback = lookback;
        self
    }

    pub fn zone_padding(mut self, continuation_atr: f64, invalidation_atr: f64) -> Self {
        self.config.zone.pad_continuation_atr = continuation_atr;
        self.config.zone.pad_invalidation_atr = invalidation_atr;
        self
    }

    pub fn min_zone_strength(mut self, strength: f64) -> Self {
        self.config.zone.min_strength = strength;
        self
    }

    pub fn retest(mut self, lookback: usize, wick_ratio: f64) -> Self {
        self.config.retest.lookback = lookback;
        self.config.retest.wick_ratio = wick_ratio;
        self
    }

    pub fn chop_window(mut self, window: usize) -> Self {
        self.config.regime.window = window;
        self
    }

    pub fn chop_policy(mut self, policy: ChopPolicy) -> Self {
        self.config.regime.policy = policy;
        self
    }

    pub fn regime_source(mut self, source: RegimeSource) -> Self {
        self.config.regime.source = source;
        self
    }

    pub fn volume_baseline(mut self, candles: usize) -> Self {
        self.config.regime.volume_baseline = candles;
        self
    }

    pub fn stop_buffer_atr(mut self, buffer: f64) -> Self {
        self.config.risk.stop_buffer_atr = buffer;
        self
    }

    pub fn take_profit_multiples(mut self, multiples: [f64; 3]) -> Self {
        self.config.risk.take_profit_multiples = multiples;
        self
    }

    pub fn entry_mode(mut self, mode: EntryMode) -> Self {
        self.config.risk.entry_mode = mode;
        self
    }

    pub fn score(mut self, score: ScoreParams) -> Self {
        self.config.score = score;
        self
    }

    pub fn min_score(mut self, min_score: f64) -> Self {
        self.config.score.min_score = min_score;
        self
    }

    pub fn build(self) -> Result<EvaluatorConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
