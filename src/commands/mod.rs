//! CLI subcommand implementations

pub mod analyze;
pub mod download;

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};

/// Default lookback of the free Polygon tier
const DEFAULT_HISTORY_WEEKS: i64 = 104;

/// Resolve optional `YYYY-MM-DD` bounds, defaulting to the last two years
pub fn date_range(start: Option<&str>, end: Option<&str>) -> Result<(NaiveDate, NaiveDate)> {
    let end = match end {
        Some(s) => parse_date(s)?,
        None => Local::now().date_naive(),
    };
    let start = match start {
        Some(s) => parse_date(s)?,
        None => end - Duration::weeks(DEFAULT_HISTORY_WEEKS),
    };

    if start > end {
        anyhow::bail!("Start date {} is after end date {}", start, end);
    }
    Ok((start, end))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").context(format!("Invalid date '{}', expected YYYY-MM-DD", s))
}
