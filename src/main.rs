//! Volume breakout analysis - main entry point
//!
//! This binary provides three subcommands:
//! - analyze: Run the breakout backtest on a bar file or freshly fetched bars
//! - download: Download daily bars from Polygon.io to a JSON file
//! - validate-key: Check a Polygon.io API key

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use volume_breakout::{PriceField, ThresholdComparison};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "volume-breakout")]
#[command(about = "Volume breakout detection and holding-period backtests on daily bars", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the breakout analysis
    Analyze {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Raw bar records (.json or .csv). Fetches from Polygon when omitted
        #[arg(short, long)]
        input: Option<String>,

        /// Ticker to fetch when no input file is given
        #[arg(short, long)]
        ticker: Option<String>,

        /// Start date (YYYY-MM-DD), defaults to two years ago
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        end: Option<String>,

        /// Volume breakout threshold in percent of the baseline
        #[arg(long)]
        volume_threshold: Option<f64>,

        /// Price change threshold in percent
        #[arg(long)]
        price_threshold: Option<f64>,

        /// Trading days to hold each position
        #[arg(long)]
        holding_days: Option<usize>,

        /// Days in the trailing volume baseline
        #[arg(long)]
        lookback: Option<usize>,

        /// Reference price: vwap or close
        #[arg(long)]
        price_field: Option<PriceField>,

        /// Threshold comparison: strict (>) or inclusive (>=)
        #[arg(long)]
        comparison: Option<ThresholdComparison>,

        /// Directory for the trades and report CSV files
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Download daily bars from Polygon.io
    Download {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Ticker symbol, e.g. AAPL
        #[arg(short, long)]
        ticker: String,

        /// Start date (YYYY-MM-DD), defaults to two years ago
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        end: Option<String>,

        /// Output file, defaults to data/{TICKER}_1d.json
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Check whether a Polygon.io API key is accepted
    ValidateKey {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Key to check instead of the configured one
        #[arg(short, long)]
        key: Option<String>,
    },
}

/// Default filter when `RUST_LOG` is unset: this crate at `info` (or `debug`
/// with `--verbose`), dependencies such as reqwest and hyper at `warn`
fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("warn,{}={}", env!("CARGO_CRATE_NAME"), level)
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // One file per run: {command}_{timestamp}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    // Console stays short so the report block reads cleanly
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(true);

    // File keeps source locations, no colors
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(tracing_appender::rolling::never("logs", &log_filename))
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Analyze { .. } => "analyze",
        Commands::Download { .. } => "download",
        Commands::ValidateKey { .. } => "validate_key",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Analyze {
            config,
            input,
            ticker,
            start,
            end,
            volume_threshold,
            price_threshold,
            holding_days,
            lookback,
            price_field,
            comparison,
            output,
        } => commands::analyze::run(commands::analyze::AnalyzeArgs {
            config,
            input,
            ticker,
            start,
            end,
            volume_threshold,
            price_threshold,
            holding_days,
            lookback,
            price_field,
            comparison,
            output,
            verbose: cli.verbose,
        }),

        Commands::Download {
            config,
            ticker,
            start,
            end,
            output,
        } => commands::download::run(config, ticker, start, end, output),

        Commands::ValidateKey { config, key } => commands::download::validate_key(config, key),
    }
}
