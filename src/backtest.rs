//! Backtesting engine
//!
//! Enters a position on every breakout day and exits a fixed number of
//! trading days later. Exits that would fall past the end of the series are
//! clamped to the last bar, so every breakout produces exactly one trade.

use tracing::{debug, info};

use crate::breakout::BreakoutDetector;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::indicators::percent_change;
use crate::report::build_report;
use crate::signals::compute_signals;
use crate::{BarSeries, BreakoutEvent, PerformanceReport, PriceField, Trade};

/// Map each breakout event to a trade exiting `holding_days` bars later.
pub fn simulate_trades<'a, I>(
    events: I,
    series: &BarSeries,
    holding_days: usize,
    price_field: PriceField,
) -> Vec<Trade>
where
    I: IntoIterator<Item = BreakoutEvent<'a>>,
{
    let Some(last_index) = series.last_index() else {
        return Vec::new();
    };

    events
        .into_iter()
        .filter_map(|event| {
            let exit_index = event.index.saturating_add(holding_days).min(last_index);
            let exit_bar = series.get(exit_index)?;
            let exit_price = exit_bar.price(price_field);
            let return_pct = exit_price.and_then(|exit| percent_change(event.entry_price, exit).ok());

            Some(Trade {
                entry_index: event.index,
                exit_index,
                entry_date: event.bar.date,
                entry_price: event.entry_price,
                exit_date: exit_bar.date,
                exit_price,
                return_pct,
            })
        })
        .collect()
}

/// Output of one analysis run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub report: PerformanceReport,
    /// Number of bars the run was computed over
    pub bars: usize,
}

/// Stateless pipeline: series and parameters in, trades and report out
#[derive(Debug, Clone)]
pub struct Backtester {
    config: AnalysisConfig,
}

impl Backtester {
    /// Validate the parameters and build the pipeline
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Backtester { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run signals, detection, simulation and aggregation over `series`
    pub fn run(&self, series: &BarSeries) -> BacktestResult {
        let config = &self.config;

        let rows = compute_signals(series, config.lookback_window, config.price_field);
        let detector = BreakoutDetector::from_config(config);
        let events = detector.detect(&rows);
        debug!(breakouts = events.clone().count(), "detected breakout days");

        let trades = simulate_trades(events, series, config.holding_days, config.price_field);
        let report = build_report(&trades);

        info!(
            bars = series.len(),
            trades = trades.len(),
            winning = report.winning_trades,
            losing = report.losing_trades,
            "backtest complete"
        );

        BacktestResult {
            trades,
            report,
            bars: series.len(),
        }
    }
}

/// Convenience wrapper around [`Backtester`]
pub fn run_analysis(series: &BarSeries, config: &AnalysisConfig) -> Result<BacktestResult> {
    Ok(Backtester::new(config.clone())?.run(series))
}
