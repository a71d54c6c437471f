//! Volume Breakout Analysis
//!
//! Detects days where trading volume and price jump together in daily equity
//! bars, simulates a fixed-horizon long position entered on each such day and
//! summarizes the outcomes.
//!
//! The pipeline runs left to right, each stage producing a new table:
//! raw records → [`BarSeries`] → [`SignalRow`]s → [`BreakoutEvent`]s →
//! [`Trade`]s → [`PerformanceReport`].

pub mod backtest;
pub mod breakout;
pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod report;
pub mod signals;
pub mod types;

pub use backtest::{run_analysis, BacktestResult, Backtester};
pub use breakout::{BreakoutDetector, ThresholdComparison};
pub use config::{AnalysisConfig, Config};
pub use error::{BreakoutError, Result};
pub use types::*;
