//! ZoneLab Runner — everything around a single evaluation.
//!
//! This crate builds on `zonelab-core` to provide:
//! - Candle providers (CSV directory, deterministic synthetic walk)
//! - Bounded retry with exponential backoff and a shared circuit breaker
//! - Per-symbol in-flight guard
//! - Parallel universe scans driven by a TOML `ScanConfig`
//! - Signal rendering and notification sinks

pub mod circuit_breaker;
pub mod csv_source;
pub mod inflight;
pub mod notify;
pub mod provider;
pub mod retry;
pub mod scan;
pub mod synthetic;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use csv_source::CsvProvider;
pub use inflight::{InFlightGuard, InFlightPermit};
pub use notify::{render_signal, MemorySink, NotificationSink, StdoutSink};
pub use provider::{CandleProvider, FetchError};
pub use retry::{RetryPolicy, RetryingProvider};
pub use scan::{
    BreakerConfig, EvaluatorSection, ScanConfig, ScanError, ScanOutcome, ScanReport, ScanSummary,
    Scanner, SourceConfig,
};
pub use synthetic::SyntheticProvider;
