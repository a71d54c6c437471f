//! Breakout detection
//!
//! A day is a breakout when its volume ratio and its price change both clear
//! the configured thresholds. Rows with an undefined ratio or price change are
//! never flagged.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::{BreakoutEvent, SignalRow};

/// How a signal value is compared with its threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdComparison {
    /// `value > threshold`
    #[default]
    Strict,
    /// `value >= threshold`
    Inclusive,
}

impl ThresholdComparison {
    fn passes(self, value: f64, threshold: f64) -> bool {
        match self {
            ThresholdComparison::Strict => value > threshold,
            ThresholdComparison::Inclusive => value >= threshold,
        }
    }
}

impl std::str::FromStr for ThresholdComparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" | "gt" | ">" => Ok(ThresholdComparison::Strict),
            "inclusive" | "ge" | ">=" => Ok(ThresholdComparison::Inclusive),
            other => Err(format!("unknown comparison '{}', expected strict or inclusive", other)),
        }
    }
}

/// Threshold predicate over signal rows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakoutDetector {
    /// Volume ratio threshold in percent of the baseline (200 = twice the baseline)
    pub volume_threshold_pct: f64,
    /// Price change threshold in percent
    pub price_threshold_pct: f64,
    pub comparison: ThresholdComparison,
}

impl BreakoutDetector {
    pub fn new(volume_threshold_pct: f64, price_threshold_pct: f64) -> Self {
        Self {
            volume_threshold_pct,
            price_threshold_pct,
            comparison: ThresholdComparison::default(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            volume_threshold_pct: config.volume_threshold_pct,
            price_threshold_pct: config.price_threshold_pct,
            comparison: config.comparison,
        }
    }

    pub fn with_comparison(mut self, comparison: ThresholdComparison) -> Self {
        self.comparison = comparison;
        self
    }

    /// Evaluate a single row
    pub fn check<'a>(&self, row: &SignalRow<'a>) -> Option<BreakoutEvent<'a>> {
        let volume_ratio = row.volume_ratio?;
        let price_change_pct = row.price_change_pct?;
        let entry_price = row.reference_price?;

        let volume_ok = self
            .comparison
            .passes(volume_ratio, self.volume_threshold_pct / 100.0);
        let price_ok = self
            .comparison
            .passes(price_change_pct, self.price_threshold_pct);

        (volume_ok && price_ok).then_some(BreakoutEvent {
            index: row.index,
            bar: row.bar,
            entry_price,
            volume_ratio,
            price_change_pct,
        })
    }

    /// Lazily yield breakout events in series order.
    ///
    /// The iterator is `Clone`; cloning it (or calling `detect` again) restarts
    /// the scan without recomputing the signals.
    pub fn detect<'r, 'a>(
        &self,
        rows: &'r [SignalRow<'a>],
    ) -> impl Iterator<Item = BreakoutEvent<'a>> + Clone + 'r
    where
        'a: 'r,
    {
        let detector = *self;
        rows.iter().filter_map(move |row| detector.check(row))
    }
}

impl Default for BreakoutDetector {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}
