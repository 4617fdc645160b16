//! Pipeline components. Each is a pure function of its inputs and the
//! parameters it was built with.

pub mod regime;
pub mod retest;
pub mod risk;
pub mod trend;
pub mod zone;

pub use regime::{Compression, RegimeConditions, RegimeFilter, RegimeMetrics, RegimeState};
pub use retest::{RetestResult, RetestValidator};
pub use risk::{RiskCalculator, RiskParameters};
pub use trend::{TrendClassifier, TrendDirection, TrendError, TrendLayers, TrendState};
pub use zone::{Zone, ZoneDetector};
