//! Human-readable signal rendering and notification sinks.

use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::Mutex;

use zonelab_core::{Decision, Signal};

/// Render a signal as a short multi-line message.
///
/// ```text
/// BTCUSDT BULL TRADE tier A score 85.0
///   zone    1297.60 - 1304.70  strength 3.00
///   entry   1301.15  stop 1297.36  risk 3.79
///   targets 1304.94 / 1308.73 / 1312.52
///   retest  confirmed (wick 0.79)
/// ```
pub fn render_signal(symbol: &str, signal: &Signal) -> String {
    let mut out = String::new();
    let direction = signal
        .direction
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());

    match signal.decision {
        Decision::Trade => {
            let tier = signal.tier.map(|t| t.to_string()).unwrap_or_default();
            let _ = write!(
                out,
                "{symbol} {direction} TRADE tier {tier} score {:.1}",
                signal.score
            );
        }
        Decision::NoTrade => {
            let _ = write!(
                out,
                "{symbol} {direction} NO_TRADE ({}) score {:.1}",
                signal.reason, signal.score
            );
        }
    }

    if let Some(zone) = &signal.zone {
        let _ = write!(
            out,
            "\n  zone    {:.2} - {:.2}  strength {:.2}",
            zone.min, zone.max, zone.strength
        );
    }
    if let Some(risk) = &signal.risk {
        let _ = write!(
            out,
            "\n  entry   {:.2}  stop {:.2}  risk {:.2}\n  targets {:.2} / {:.2} / {:.2}",
            risk.entry,
            risk.stop_loss,
            risk.risk_distance,
            risk.take_profit[0],
            risk.take_profit[1],
            risk.take_profit[2]
        );
    }
    if let Some(retest) = &signal.retest {
        let _ = write!(out, "\n  retest  confirmed (wick {:.2})", retest.wick_ratio);
    }
    if let Some(regime) = &signal.regime {
        if regime.chop {
            let _ = write!(out, "\n  regime  chop ({}/4 conditions)", regime.score);
        }
    }
    out
}

/// Destination for evaluated signals.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, symbol: &str, signal: &Signal);
}

/// Prints trade signals to stdout. `NO_TRADE` outcomes are printed only when
/// `verbose` is set.
#[derive(Debug, Default)]
pub struct StdoutSink {
    verbose: bool,
    // Serializes multi-line messages from parallel scans.
    out: Mutex<()>,
}

impl StdoutSink {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            out: Mutex::new(()),
        }
    }
}

impl NotificationSink for StdoutSink {
    fn notify(&self, symbol: &str, signal: &Signal) {
        if !signal.is_trade() && !self.verbose {
            return;
        }
        let text = render_signal(symbol, signal);
        let _lock = self.out.lock();
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        let _ = writeln!(handle, "{text}");
    }
}

/// Collects rendered messages in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, symbol: &str, signal: &Signal) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(render_signal(symbol, signal));
        }
    }
}
