//! ZoneLab CLI — evaluate, scan, and config commands.
//!
//! Commands:
//! - `evaluate`: one symbol from CSV files (or synthetic data)
//! - `scan`: a whole universe from a TOML scan config
//! - `config`: print an evaluator config as TOML with its fingerprint

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use zonelab_core::domain::{Snapshot, Timeframe};
use zonelab_core::fingerprint::DatasetHash;
use zonelab_core::{AssetProfile, ChopPolicy, Evaluator, EvaluatorConfig};
use zonelab_runner::{
    render_signal, CandleProvider, CircuitBreaker, CsvProvider, NotificationSink, RetryPolicy,
    RetryingProvider, ScanConfig, ScanReport, Scanner, StdoutSink, SyntheticProvider,
};

#[derive(Parser)]
#[command(
    name = "zonelab",
    about = "ZoneLab CLI — deterministic trend/zone/retest signal evaluator"
)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one symbol and print the signal.
    Evaluate {
        /// Symbol, e.g. BTCUSDT.
        #[arg(long)]
        symbol: String,

        /// Directory of `<SYMBOL>_<tf>.csv` files. Defaults to ./data.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Use seeded synthetic candles instead of CSV files.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Seed for --synthetic.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Candles per series for --synthetic.
        #[arg(long, default_value_t = 500)]
        len: usize,

        /// Higher (trend) timeframe.
        #[arg(long, default_value = "4h")]
        htf: Timeframe,

        /// Execution (zone/retest) timeframe.
        #[arg(long, default_value = "1h")]
        exec: Timeframe,

        /// Asset profile: default, major, altcoin, index.
        #[arg(long, default_value = "default")]
        profile: AssetProfile,

        /// Evaluator TOML file (replaces --profile).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the minimum score for TRADE.
        #[arg(long)]
        min_score: Option<f64>,

        /// Downweight chop instead of suppressing it.
        #[arg(long, default_value_t = false)]
        penalize_chop: bool,

        /// Evaluation clock (RFC 3339); every series must be closed by then.
        /// Defaults to now.
        #[arg(long)]
        as_of: Option<String>,

        /// Print the full signal as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Evaluate every symbol of a scan config.
    Scan {
        /// Path to a TOML scan config.
        #[arg(long)]
        config: PathBuf,

        /// Also print NO_TRADE outcomes.
        #[arg(long, default_value_t = false)]
        all: bool,

        /// Print one JSON report per line instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Evaluation clock (RFC 3339), overriding the config's `as_of`.
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Print an evaluator config as TOML together with its fingerprint.
    Config {
        /// Asset profile: default, major, altcoin, index.
        #[arg(long, default_value = "default")]
        profile: AssetProfile,

        /// Validate and print this TOML file instead of a profile.
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Evaluate {
            symbol,
            data_dir,
            synthetic,
            seed,
            len,
            htf,
            exec,
            profile,
            config,
            min_score,
            penalize_chop,
            as_of,
            json,
        } => {
            let evaluator_config =
                build_evaluator_config(profile, config, htf, exec, min_score, penalize_chop)?;
            let provider: Box<dyn CandleProvider> = if synthetic {
                Box::new(SyntheticProvider::with_default_anchor(seed, len))
            } else {
                Box::new(CsvProvider::new(data_dir))
            };
            let as_of = match as_of.as_deref() {
                Some(raw) => parse_clock(raw)?,
                None => Utc::now(),
            };
            run_evaluate(&symbol, provider, evaluator_config, as_of, json)
        }
        Commands::Scan {
            config,
            all,
            json,
            as_of,
        } => {
            let as_of = as_of.as_deref().map(parse_clock).transpose()?;
            run_scan(config, all, json, as_of)
        }
        Commands::Config { profile, file } => run_config(profile, file),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,zonelab=debug,zonelab_core=debug,zonelab_runner=debug"
    } else {
        "warn,zonelab=info,zonelab_core=info,zonelab_runner=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_clock(raw: &str) -> Result<DateTime<Utc>> {
    let t = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("--as-of '{raw}' is not an RFC 3339 timestamp"))?;
    Ok(t.with_timezone(&Utc))
}

fn build_evaluator_config(
    profile: AssetProfile,
    file: Option<PathBuf>,
    htf: Timeframe,
    exec: Timeframe,
    min_score: Option<f64>,
    penalize_chop: bool,
) -> Result<EvaluatorConfig> {
    if htf <= exec {
        bail!("--htf ({htf}) must be a longer timeframe than --exec ({exec})");
    }
    let mut config = match file {
        Some(path) => EvaluatorConfig::from_file(&path)
            .with_context(|| format!("loading evaluator config {}", path.display()))?,
        None => profile.config(),
    };
    config.htf_timeframe = Some(htf);
    config.execution_timeframe = Some(exec);
    if let Some(min_score) = min_score {
        config.score.min_score = min_score;
    }
    if penalize_chop {
        config.regime.policy = ChopPolicy::Penalize;
    }
    config.validate().context("invalid evaluator config")?;
    Ok(config)
}

fn run_evaluate(
    symbol: &str,
    provider: Box<dyn CandleProvider>,
    config: EvaluatorConfig,
    as_of: DateTime<Utc>,
    json: bool,
) -> Result<()> {
    let htf = config.htf_timeframe.unwrap_or(Timeframe::H4);
    let exec = config.execution_timeframe.unwrap_or(Timeframe::H1);
    let evaluator = Evaluator::new(config).context("building evaluator")?;
    let provider = RetryingProvider::new(
        provider,
        RetryPolicy::default(),
        Arc::new(CircuitBreaker::default_provider()),
    );
    debug!(provider = provider.name(), symbol, "fetching candles");

    let htf_series = provider
        .fetch(symbol, htf)
        .with_context(|| format!("fetching {htf} candles for {symbol}"))?;
    let exec_series = provider
        .fetch(symbol, exec)
        .with_context(|| format!("fetching {exec} candles for {symbol}"))?;

    let snapshot = Snapshot::new(htf_series, exec_series).with_clock(as_of);
    let signal = evaluator
        .evaluate(&snapshot)
        .with_context(|| format!("evaluating {symbol}"))?;

    if json {
        let report = ScanReport {
            symbol: symbol.to_string(),
            signal,
            config_hash: evaluator.config_hash().clone(),
            dataset_hash: DatasetHash::of_snapshot(&snapshot),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render_signal(symbol, &signal));
        println!("  config  {}", evaluator.config_hash().short());
        println!("  signal  {}", signal.fingerprint());
    }
    Ok(())
}

/// Prints one JSON report per evaluated symbol.
struct JsonLinesSink;

impl NotificationSink for JsonLinesSink {
    fn notify(&self, symbol: &str, signal: &zonelab_core::Signal) {
        let line = serde_json::json!({ "symbol": symbol, "signal": signal });
        println!("{line}");
    }
}

fn run_scan(path: PathBuf, all: bool, json: bool, as_of: Option<DateTime<Utc>>) -> Result<()> {
    let mut config = ScanConfig::from_file(&path)
        .with_context(|| format!("loading scan config {}", path.display()))?;
    if as_of.is_some() {
        config.as_of = as_of;
    }
    let scanner = Scanner::new(&config, config.build_provider())
        .context("building evaluators for the scan universe")?;
    info!(symbols = config.universe.len(), "scanning");

    let summary = if json {
        scanner.scan(&JsonLinesSink)
    } else {
        scanner.scan(&StdoutSink::new(all))
    };

    for outcome in &summary.outcomes {
        if let Err(err) = &outcome.result {
            eprintln!("Error for {}: {err}", outcome.symbol);
        }
    }
    if !json {
        println!();
        println!(
            "Scanned {} symbol(s): {} trade(s), {} error(s).",
            summary.outcomes.len(),
            summary.trade_count(),
            summary.error_count()
        );
    }
    if summary.error_count() == summary.outcomes.len() {
        bail!("every symbol in the universe failed");
    }
    Ok(())
}

fn run_config(profile: AssetProfile, file: Option<PathBuf>) -> Result<()> {
    let config = match file {
        Some(path) => EvaluatorConfig::from_file(&path)
            .with_context(|| format!("loading evaluator config {}", path.display()))?,
        None => EvaluatorConfig::for_profile(profile),
    };
    config.validate().context("invalid evaluator config")?;
    println!("# fingerprint: {}", config.fingerprint());
    print!("{}", config.to_toml_string()?);
    Ok(())
}
