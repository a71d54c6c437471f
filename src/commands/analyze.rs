//! Analyze command implementation

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use volume_breakout::data::{self, PolygonClient};
use volume_breakout::report::{save_report_csv, save_trades_csv};
use volume_breakout::{Backtester, Config, PriceField, ThresholdComparison};

#[derive(Debug)]
pub struct AnalyzeArgs {
    pub config: Option<String>,
    pub input: Option<String>,
    pub ticker: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub volume_threshold: Option<f64>,
    pub price_threshold: Option<f64>,
    pub holding_days: Option<usize>,
    pub lookback: Option<usize>,
    pub price_field: Option<PriceField>,
    pub comparison: Option<ThresholdComparison>,
    pub output: Option<String>,
    pub verbose: bool,
}

pub fn run(args: AnalyzeArgs) -> Result<()> {
    info!("Starting breakout analysis");

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(path) = &args.config {
        info!("Loaded configuration from: {}", path);
    }

    // Apply overrides
    let analysis = &mut config.analysis;
    if let Some(v) = args.volume_threshold {
        analysis.volume_threshold_pct = v;
    }
    if let Some(v) = args.price_threshold {
        analysis.price_threshold_pct = v;
    }
    if let Some(v) = args.holding_days {
        analysis.holding_days = v;
    }
    if let Some(v) = args.lookback {
        analysis.lookback_window = v;
    }
    if let Some(v) = args.price_field {
        analysis.price_field = v;
    }
    if let Some(v) = args.comparison {
        analysis.comparison = v;
    }
    debug!("Analysis parameters: {:?}", config.analysis);

    let backtester = Backtester::new(config.analysis.clone())?;

    // Load data
    let (label, records) = match (&args.input, &args.ticker) {
        (Some(input), _) => {
            let path = Path::new(input);
            let label = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("bars")
                .to_string();
            (label, data::load_records(path)?)
        }
        (None, Some(ticker)) => {
            let (start, end) = super::date_range(args.start.as_deref(), args.end.as_deref())?;
            let client = PolygonClient::from_config(&config.polygon)?;
            (ticker.to_uppercase(), client.fetch_daily_bars(ticker, start, end)?)
        }
        (None, None) => anyhow::bail!("Provide either --input or --ticker"),
    };

    if records.is_empty() {
        println!("No data available for {}", label);
        return Ok(());
    }

    let price_field = backtester.config().price_field;
    let series = data::normalize(&records, price_field)
        .context("Failed to normalize bar records")?;
    info!("Normalized {} bars for {}", series.len(), label);

    info!("Running analysis...");
    let result = backtester.run(&series);
    let metrics = &result.report;

    println!("\n{}", "=".repeat(60));
    println!("BREAKOUT PERFORMANCE REPORT: {}", label);
    println!("{}", "=".repeat(60));
    println!("Reference Price:    {}", price_field);
    println!("Bars Analyzed:      {}", result.bars);
    if metrics.is_empty() {
        println!("No Breakout");
    } else {
        println!("Total Trades:       {}", metrics.total_trades);
        println!("Winning Trades:     {}", metrics.winning_trades);
        println!("Losing Trades:      {}", metrics.losing_trades);
        println!("Win Rate:           {}", fmt_pct(metrics.win_rate()));
        println!("Avg Return:         {}", fmt_pct(metrics.avg_return));
        println!("Max Return:         {}", fmt_pct(metrics.max_return));
        println!("Min Return:         {}", fmt_pct(metrics.min_return));
    }
    println!("{}", "=".repeat(60));

    if args.verbose {
        println!("\nTRADES:");
        for (i, trade) in result.trades.iter().enumerate() {
            println!(
                "#{} Entry: {:.2} @ {} | Exit: {} @ {} ({} bars) | Return: {}",
                i + 1,
                trade.entry_price,
                trade.entry_date,
                trade
                    .exit_price
                    .map_or_else(|| "-".to_string(), |p| format!("{:.2}", p)),
                trade.exit_date,
                trade.bars_held(),
                fmt_pct(trade.return_pct)
            );
        }
    }

    let out_dir = PathBuf::from(args.output.unwrap_or(config.output.results_dir));
    save_trades_csv(&result.trades, out_dir.join(format!("{}_trades.csv", label)))?;
    save_report_csv(&result.report, out_dir.join(format!("{}_report.csv", label)))?;

    info!("Analysis completed successfully");

    Ok(())
}

fn fmt_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}%", v))
}
