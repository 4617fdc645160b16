//! Domain types for ZoneLab

pub mod candle;
pub mod direction;
pub mod snapshot;
pub mod timeframe;

pub use candle::{Candle, CandleSeries};
pub use direction::Direction;
pub use snapshot::Snapshot;
pub use timeframe::{ParseTimeframeError, Timeframe};

/// Symbol type alias
pub type Symbol = String;
