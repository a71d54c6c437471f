//! Core data types used across the breakout pipeline
//!
//! Every stage has its own fixed-schema record: [`Bar`] in, [`SignalRow`],
//! [`BreakoutEvent`] and [`Trade`] in the middle, [`PerformanceReport`] out.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{BreakoutError, Result};

/// A raw bar record as delivered by the market data provider: field name to value.
pub type RawRecord = serde_json::Map<String, Value>;

/// Price column used for price change, entry and exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceField {
    Close,
    /// Volume-weighted average price. Avoids trading at a close that was
    /// only known after the breakout volume printed.
    #[default]
    Vwap,
}

impl PriceField {
    /// Key of this price in a raw provider record
    pub fn record_key(self) -> &'static str {
        match self {
            PriceField::Close => crate::data::fields::CLOSE,
            PriceField::Vwap => crate::data::fields::VWAP,
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceField::Close => write!(f, "close"),
            PriceField::Vwap => write!(f, "vwap"),
        }
    }
}

impl FromStr for PriceField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "close" | "c" => Ok(PriceField::Close),
            "vwap" | "vw" => Ok(PriceField::Vwap),
            other => Err(format!("unknown price field '{}', expected close or vwap", other)),
        }
    }
}

/// One trading day's aggregate record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    /// UTC calendar date of `timestamp`
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub close: Option<f64>,
    pub vwap: Option<f64>,
    /// `None` when the provider left the day's volume out
    pub volume: Option<f64>,
    /// Provider fields the pipeline does not interpret, kept as delivered
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Option<f64>,
        close: Option<f64>,
        vwap: Option<f64>,
        volume: impl Into<Option<f64>>,
    ) -> Self {
        Self {
            timestamp,
            date: timestamp.date_naive(),
            open,
            close,
            vwap,
            volume: volume.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn price(&self, field: PriceField) -> Option<f64> {
        match field {
            PriceField::Close => self.close,
            PriceField::Vwap => self.vwap,
        }
    }
}

/// Ordered, immutable sequence of bars indexed by position.
///
/// Timestamps are strictly ascending. Gaps between trading days are kept as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Build a series from bars that are already sorted.
    ///
    /// Fails with `MalformedInput` on a duplicate or out-of-order timestamp.
    pub fn from_sorted(bars: Vec<Bar>) -> Result<Self> {
        if let Some(i) = (1..bars.len()).find(|&i| bars[i].timestamp <= bars[i - 1].timestamp) {
            return Err(BreakoutError::malformed(format!(
                "bar {} at {} is not after bar {} at {}",
                i,
                bars[i].timestamp,
                i - 1,
                bars[i - 1].timestamp
            )));
        }
        Ok(Self { bars })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.bars.len().checked_sub(1)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
        self.bars.iter()
    }
}

impl<'a> IntoIterator for &'a BarSeries {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}

/// A bar plus its rolling signals. `None` marks "no value".
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalRow<'a> {
    pub index: usize,
    pub bar: &'a Bar,
    pub reference_price: Option<f64>,
    pub avg_volume_baseline: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub price_change_pct: Option<f64>,
}

/// A signal row that crossed both thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakoutEvent<'a> {
    /// Position in the bar series, used for exit lookup
    pub index: usize,
    pub bar: &'a Bar,
    pub entry_price: f64,
    pub volume_ratio: f64,
    pub price_change_pct: f64,
}

/// Simulated fixed-horizon holding trade. Serializes to the Trade Table columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    #[serde(skip)]
    pub entry_index: usize,
    #[serde(skip)]
    pub exit_index: usize,
    #[serde(rename = "Entry Date")]
    pub entry_date: NaiveDate,
    #[serde(rename = "Entry Price")]
    pub entry_price: f64,
    #[serde(rename = "Exit Date")]
    pub exit_date: NaiveDate,
    #[serde(rename = "Exit Price")]
    pub exit_price: Option<f64>,
    #[serde(rename = "Return %")]
    pub return_pct: Option<f64>,
}

impl Trade {
    /// Trading days actually held (less than the holding period when clamped)
    pub fn bars_held(&self) -> usize {
        self.exit_index - self.entry_index
    }
}

/// Aggregate statistics over a trade table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceReport {
    #[serde(rename = "Total Trades")]
    pub total_trades: usize,
    #[serde(rename = "Winning Trades")]
    pub winning_trades: usize,
    #[serde(rename = "Losing Trades")]
    pub losing_trades: usize,
    #[serde(rename = "Avg Return")]
    pub avg_return: Option<f64>,
    #[serde(rename = "Max Return")]
    pub max_return: Option<f64>,
    #[serde(rename = "Min Return")]
    pub min_return: Option<f64>,
}

impl PerformanceReport {
    /// True when no trade contributed, i.e. "no trades found"
    pub fn is_empty(&self) -> bool {
        self.total_trades == 0
    }

    /// Share of winning trades in percent
    pub fn win_rate(&self) -> Option<f64> {
        if self.total_trades == 0 {
            None
        } else {
            Some(self.winning_trades as f64 / self.total_trades as f64 * 100.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar_at(day: u32) -> Bar {
        let ts = Utc.with_ymd_and_hms(2024, 3, day, 5, 0, 0).unwrap();
        Bar::new(ts, Some(10.0), Some(10.2), Some(10.1), 1_000.0)
    }

    #[test]
    fn test_bar_date_is_utc_day() {
        let bar = bar_at(4);
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(bar.price(PriceField::Close), Some(10.2));
        assert_eq!(bar.price(PriceField::Vwap), Some(10.1));
    }

    #[test]
    fn test_series_rejects_duplicates() {
        let err = BarSeries::from_sorted(vec![bar_at(4), bar_at(4)]).unwrap_err();
        assert!(matches!(err, BreakoutError::MalformedInput(_)));
    }

    #[test]
    fn test_series_rejects_unsorted() {
        assert!(BarSeries::from_sorted(vec![bar_at(5), bar_at(4)]).is_err());
    }

    #[test]
    fn test_series_accessors() {
        let series = BarSeries::from_sorted(vec![bar_at(4), bar_at(5), bar_at(7)]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.last_index(), Some(2));
        assert_eq!(BarSeries::empty().last_index(), None);
    }

    #[test]
    fn test_price_field_parse() {
        assert_eq!("VWAP".parse::<PriceField>().unwrap(), PriceField::Vwap);
        assert_eq!("close".parse::<PriceField>().unwrap(), PriceField::Close);
        assert!("high".parse::<PriceField>().is_err());
    }

    #[test]
    fn test_win_rate() {
        assert_eq!(PerformanceReport::default().win_rate(), None);

        let report = PerformanceReport {
            total_trades: 4,
            winning_trades: 3,
            losing_trades: 1,
            ..Default::default()
        };
        assert_eq!(report.win_rate(), Some(75.0));
    }
}
