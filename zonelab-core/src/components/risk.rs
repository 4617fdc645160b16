//! Risk projection: entry, stop-loss and take-profit ladder for a zone.

use serde::{Deserialize, Serialize};

use crate::components::retest::RetestResult;
use crate::components::zone::Zone;
use crate::config::{EntryMode, RiskParams};
use crate::domain::{Candle, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskParameters {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: [f64; 3],
    /// |entry - stop_loss|, always positive.
    pub risk_distance: f64,
}

impl RiskParameters {
    /// Whether a bar has already traded through the stop.
    pub fn is_breached_by(&self, candle: &Candle, direction: Direction) -> bool {
        match direction {
            Direction::Bull => candle.low <= self.stop_loss,
            Direction::Bear => candle.high >= self.stop_loss,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RiskCalculator {
    params: RiskParams,
}

impl RiskCalculator {
    pub fn new(params: &RiskParams) -> Self {
        Self {
            params: params.clone(),
        }
    }

    /// Project risk for a trade in `direction` from `zone`.
    ///
    /// `atr` is the ATR at the last closed candle. Returns `None` when it is
    /// unusable, when the risk distance degenerates, or when the entry ends up
    /// on the wrong side of the stop.
    pub fn calculate(
        &self,
        zone: &Zone,
        direction: Direction,
        atr: f64,
        retest: Option<&RetestResult>,
    ) -> Option<RiskParameters> {
        if !(atr.is_finite() && atr > 0.0) {
            return None;
        }

        let entry = match (self.params.entry_mode, retest) {
            (EntryMode::RetestClose, Some(r)) if r.confirmed => r.candle.close,
            _ => zone.midpoint,
        };

        let buffer = self.params.stop_buffer_atr * atr;
        let stop_loss = match direction {
            Direction::Bull => zone.min - buffer,
            Direction::Bear => zone.max + buffer,
        };

        // Signed distance in the trade direction: positive means the entry
        // sits on the profitable side of the stop.
        let risk_distance = (entry - stop_loss) * direction.sign();
        if !(risk_distance.is_finite() && risk_distance > 0.0) {
            return None;
        }

        let step = risk_distance * direction.sign();
        let m = self.params.take_profit_multiples;
        Some(RiskParameters {
            entry,
            stop_loss,
            take_profit: [entry + m[0] * step, entry + m[1] * step, entry + m[2] * step],
            risk_distance,
        })
    }
}
