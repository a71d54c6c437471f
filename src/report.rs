//! Performance aggregation and tabular output
//!
//! CSV headers and column order are fixed:
//! trades are `Entry Date,Entry Price,Exit Date,Exit Price,Return %` and the
//! report is `Total Trades,Winning Trades,Losing Trades,Avg Return,Max Return,Min Return`.

use anyhow::{Context, Result};
use statrs::statistics::Statistics;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::{PerformanceReport, Trade};

/// Reduce a trade table to summary statistics.
///
/// A trade with a zero return counts as a win. Trades without a defined
/// return are left out of every count and statistic.
pub fn build_report(trades: &[Trade]) -> PerformanceReport {
    let returns: Vec<f64> = trades.iter().filter_map(|t| t.return_pct).collect();

    if returns.is_empty() {
        return PerformanceReport::default();
    }

    let winning_trades = returns.iter().filter(|&&r| r >= 0.0).count();
    let losing_trades = returns.iter().filter(|&&r| r < 0.0).count();

    PerformanceReport {
        total_trades: winning_trades + losing_trades,
        winning_trades,
        losing_trades,
        avg_return: Some(Statistics::mean(&returns)),
        max_return: Some(Statistics::max(&returns)),
        min_return: Some(Statistics::min(&returns)),
    }
}

/// Write the trade table as CSV
pub fn write_trades_csv<W: Write>(writer: W, trades: &[Trade]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if trades.is_empty() {
        wtr.write_record(TRADE_COLUMNS)?;
    }
    for trade in trades {
        wtr.serialize(trade).context("Failed to serialize trade")?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the performance report as a single-row CSV
pub fn write_report_csv<W: Write>(writer: W, report: &PerformanceReport) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.serialize(report).context("Failed to serialize report")?;
    wtr.flush()?;
    Ok(())
}

/// Trade table header, also written when there are no trades
pub const TRADE_COLUMNS: [&str; 5] = ["Entry Date", "Entry Price", "Exit Date", "Exit Price", "Return %"];

/// Save the trade table to `{dir}/{name}`
pub fn save_trades_csv(trades: &[Trade], path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    let file = File::create(&path).context("Failed to create trades file")?;
    write_trades_csv(file, trades)?;

    info!("Saved {} trades to {}", trades.len(), path.display());
    Ok(path)
}

pub fn save_report_csv(report: &PerformanceReport, path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    let file = File::create(&path).context("Failed to create report file")?;
    write_report_csv(file, report)?;

    info!("Saved performance report to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn trade(day: u32, return_pct: Option<f64>) -> Trade {
        let date = NaiveDate::from_ymd_opt(2024, 4, day).unwrap();
        Trade {
            entry_index: day as usize,
            exit_index: day as usize + 10,
            entry_date: date,
            entry_price: 100.0,
            exit_date: date + chrono::Duration::days(14),
            exit_price: return_pct.map(|r| 100.0 + r),
            return_pct,
        }
    }

    #[test]
    fn test_report_win_loss_split() {
        let trades: Vec<Trade> = [5.0, -3.0, 2.0, 0.0]
            .iter()
            .enumerate()
            .map(|(i, &r)| trade(i as u32 + 1, Some(r)))
            .collect();

        let report = build_report(&trades);
        assert_eq!(report.total_trades, 4);
        assert_eq!(report.winning_trades, 3);
        assert_eq!(report.losing_trades, 1);
        assert_relative_eq!(report.avg_return.unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(report.max_return, Some(5.0));
        assert_eq!(report.min_return, Some(-3.0));
    }

    #[test]
    fn test_empty_report() {
        let report = build_report(&[]);
        assert_eq!(report, PerformanceReport::default());
        assert!(report.is_empty());
        assert_eq!(report.max_return, None);
    }

    #[test]
    fn test_undefined_returns_are_skipped() {
        let report = build_report(&[trade(1, None), trade(2, Some(-1.5))]);
        assert_eq!(report.total_trades, 1);
        assert_eq!(report.losing_trades, 1);
        assert_eq!(report.avg_return, Some(-1.5));
    }

    #[test]
    fn test_trades_csv_header_and_rows() {
        let mut buf = Vec::new();
        write_trades_csv(&mut buf, &[trade(3, Some(2.5)), trade(4, None)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Entry Date,Entry Price,Exit Date,Exit Price,Return %");
        assert_eq!(lines[1], "2024-04-03,100.0,2024-04-17,102.5,2.5");
        assert_eq!(lines[2], "2024-04-04,100.0,2024-04-18,,");
    }

    #[test]
    fn test_empty_trades_csv_keeps_header() {
        let mut buf = Vec::new();
        write_trades_csv(&mut buf, &[]).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap().trim_end(),
            "Entry Date,Entry Price,Exit Date,Exit Price,Return %"
        );
    }

    #[test]
    fn test_report_csv() {
        let mut buf = Vec::new();
        write_report_csv(&mut buf, &PerformanceReport::default()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "Total Trades,Winning Trades,Losing Trades,Avg Return,Max Return,Min Return"
        );
        assert_eq!(lines[1], "0,0,0,,,");
    }
}
