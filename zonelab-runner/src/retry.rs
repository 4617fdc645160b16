//! Bounded retry with exponential backoff around any candle provider.
//!
//! Retry lives here, outside the evaluator: a scan asks the provider for
//! candles, and only transient failures (`FetchError::is_retryable`) are
//! retried. A shared [`CircuitBreaker`] stops every symbol from hammering a
//! provider that is rate limiting or has banned us.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zonelab_core::domain::{CandleSeries, Timeframe};

use crate::circuit_breaker::CircuitBreaker;
use crate::provider::{CandleProvider, FetchError};

/// Retry schedule: `base_delay_ms · 2^attempt`, capped at `max_delay_ms`,
/// optionally spread ±25%.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts. For tests and local files.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter: false,
        }
    }

    /// Delay before retry number `attempt + 1` (attempt is zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let delay = self
            .base_delay_ms
            .saturating_mul(1_u64 << attempt.min(16))
            .min(self.max_delay_ms);

        let jittered = if self.jitter && delay >= 4 {
            let range = delay / 4;
            delay - range + rand::thread_rng().gen_range(0..=range * 2)
        } else {
            delay
        };
        Duration::from_millis(jittered)
    }
}

/// Wraps a provider with retry and circuit-breaker logic.
pub struct RetryingProvider<P> {
    inner: P,
    policy: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
    name: String,
}

impl<P: CandleProvider> RetryingProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy, breaker: Arc<CircuitBreaker>) -> Self {
        let name = format!("retrying({})", inner.name());
        Self {
            inner,
            policy,
            breaker,
            name,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn refuse(&self) -> FetchError {
        FetchError::CircuitOpen {
            remaining_secs: self.breaker.remaining_cooldown().as_secs(),
        }
    }
}

impl<P: CandleProvider> CandleProvider for RetryingProvider<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<CandleSeries, FetchError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last = None;

        for attempt in 0..attempts {
            if !self.breaker.is_allowed() {
                return Err(self.refuse());
            }

            match self.inner.fetch(symbol, timeframe) {
                Ok(series) => {
                    self.breaker.record_success();
                    if attempt > 0 {
                        debug!(symbol, %timeframe, attempt, "fetch recovered");
                    }
                    return Ok(series);
                }
                Err(err @ FetchError::Banned(_)) => {
                    self.breaker.trip();
                    return Err(err);
                }
                Err(err) if err.is_retryable() => {
                    self.breaker.record_failure();
                    warn!(symbol, %timeframe, attempt, error = %err, "retryable fetch failure");

                    if attempt + 1 < attempts {
                        let mut delay = self.policy.delay(attempt);
                        if let FetchError::RateLimited { retry_after_secs } = err {
                            let hinted = Duration::from_secs(retry_after_secs)
                                .min(Duration::from_millis(self.policy.max_delay_ms));
                            delay = delay.max(hinted);
                        }
                        if !delay.is_zero() {
                            std::thread::sleep(delay);
                        }
                    }
                    last = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        match last {
            Some(err) => Err(FetchError::RetriesExhausted {
                symbol: symbol.to_string(),
                attempts,
                last: Box::new(err),
            }),
            None => Err(self.refuse()),
        }
    }
}
