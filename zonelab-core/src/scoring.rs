//! Weighted signal score, bounded to [0, 100].

use crate::components::{Compression, RegimeState, RetestResult, TrendState, Zone};
use crate::config::{ChopPolicy, ScoreParams};
use crate::signal::ScoreBreakdown;

/// Everything the scorer reads. Borrowed from the evaluation in progress.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs<'a> {
    pub trend: &'a TrendState,
    pub zone: &'a Zone,
    pub retest: Option<&'a RetestResult>,
    pub regime: &'a RegimeState,
    pub compression: Option<Compression>,
}

#[derive(Debug, Clone)]
pub struct SignalScorer {
    params: ScoreParams,
    policy: ChopPolicy,
}

impl SignalScorer {
    pub fn new(params: &ScoreParams, policy: ChopPolicy) -> Self {
        Self {
            params: params.clone(),
            policy,
        }
    }

    pub fn min_score(&self) -> f64 {
        self.params.min_score
    }

    pub fn score(&self, inputs: &ScoreInputs<'_>) -> ScoreBreakdown {
        let p = &self.params;

        let alignment = if inputs.trend.direction() == Some(inputs.zone.polarity) {
            p.weight_trend * f64::from(inputs.trend.evidence_layers.min(3)) / 3.0
        } else {
            0.0
        };

        let quality = (inputs.zone.strength / p.zone_strength_full).clamp(0.0, 1.0);
        let zone_quality = if quality.is_finite() {
            p.weight_zone * quality
        } else {
            0.0
        };

        let retest = match inputs.retest {
            Some(r) if r.confirmed => p.weight_retest,
            _ => 0.0,
        };

        let compression = match inputs.compression {
            Some(c) if c.compressed => p.weight_compression,
            _ => 0.0,
        };

        // Under Suppress a chop window never reaches the scorer.
        let chop_penalty = if inputs.regime.chop && self.policy == ChopPolicy::Penalize {
            p.weight_chop_penalty
        } else {
            0.0
        };

        let total = (alignment + zone_quality + retest + compression - chop_penalty).clamp(0.0, 100.0);

        ScoreBreakdown {
            alignment,
            zone_quality,
            retest,
            compression,
            chop_penalty,
            total,
        }
    }
}
