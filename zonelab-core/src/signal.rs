//! Evaluation output.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::components::{RegimeState, RetestResult, RiskParameters, TrendState, Zone};
use crate::domain::Direction;
use crate::fingerprint::SignalHash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Trade,
    NoTrade,
}

/// Why the pipeline stopped where it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    Qualified,
    InsufficientData,
    TrendInvalid,
    NoZone,
    RegimeChop,
    StopBreached,
    RiskUnavailable,
    LowScore,
}

impl ReasonCode {
    pub const ALL: [ReasonCode; 8] = [
        Self::Qualified,
        Self::InsufficientData,
        Self::TrendInvalid,
        Self::NoZone,
        Self::RegimeChop,
        Self::StopBreached,
        Self::RiskUnavailable,
        Self::LowScore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Qualified => "QUALIFIED",
            Self::InsufficientData => "INSUFFICIENT_DATA",
            Self::TrendInvalid => "TREND_INVALID",
            Self::NoZone => "NO_ZONE",
            Self::RegimeChop => "REGIME_CHOP",
            Self::StopBreached => "STOP_BREACHED",
            Self::RiskUnavailable => "RISK_UNAVAILABLE",
            Self::LowScore => "LOW_SCORE",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SignalTier {
    A,
    B,
    C,
}

impl SignalTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::A
        } else if score >= 65.0 {
            Self::B
        } else {
            Self::C
        }
    }
}

impl fmt::Display for SignalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        };
        f.write_str(s)
    }
}

/// Per-component score contributions. `chop_penalty` is stored as a
/// non-negative amount that was subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub alignment: f64,
    pub zone_quality: f64,
    pub retest: f64,
    pub compression: f64,
    pub chop_penalty: f64,
    pub total: f64,
}

/// Result of one evaluation. Every stage that ran leaves its output here, so a
/// `NO_TRADE` still shows how far the pipeline got.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub decision: Decision,
    pub reason: ReasonCode,
    pub direction: Option<Direction>,
    pub trend: Option<TrendState>,
    pub zone: Option<Zone>,
    pub retest: Option<RetestResult>,
    pub regime: Option<RegimeState>,
    pub risk: Option<RiskParameters>,
    pub score: f64,
    pub tier: Option<SignalTier>,
    pub breakdown: ScoreBreakdown,
}

impl Signal {
    pub fn no_trade(reason: ReasonCode) -> Self {
        Self {
            decision: Decision::NoTrade,
            reason,
            direction: None,
            trend: None,
            zone: None,
            retest: None,
            regime: None,
            risk: None,
            score: 0.0,
            tier: None,
            breakdown: ScoreBreakdown::default(),
        }
    }

    pub fn is_trade(&self) -> bool {
        self.decision == Decision::Trade
    }

    pub fn fingerprint(&self) -> SignalHash {
        SignalHash::of(self)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
