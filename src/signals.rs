//! Rolling signal calculation
//!
//! Derives, for every bar, the trailing volume baseline, the volume ratio
//! against that baseline and the day-over-day change of the reference price.

use tracing::debug;

use crate::indicators::{pct_change, ratio, trailing_mean};
use crate::{BarSeries, PriceField, SignalRow};

/// Compute one [`SignalRow`] per bar, in series order.
///
/// `lookback` is the maximum number of prior days in the volume baseline.
pub fn compute_signals(
    series: &BarSeries,
    lookback: usize,
    price_field: PriceField,
) -> Vec<SignalRow<'_>> {
    let volumes: Vec<Option<f64>> = series.iter().map(|b| b.volume).collect();
    let prices: Vec<Option<f64>> = series.iter().map(|b| b.price(price_field)).collect();

    let baselines = trailing_mean(&volumes, lookback);
    let price_changes = pct_change(&prices);

    let rows: Vec<SignalRow<'_>> = series
        .iter()
        .enumerate()
        .map(|(index, bar)| {
            let avg_volume_baseline = baselines[index];
            let volume_ratio = bar
                .volume
                .zip(avg_volume_baseline)
                .and_then(|(volume, base)| ratio(volume, base).ok());

            SignalRow {
                index,
                bar,
                reference_price: prices[index],
                avg_volume_baseline,
                volume_ratio,
                price_change_pct: price_changes[index],
            }
        })
        .collect();

    debug!(
        bars = rows.len(),
        lookback,
        %price_field,
        with_ratio = rows.iter().filter(|r| r.volume_ratio.is_some()).count(),
        "computed rolling signals"
    );

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn series(volumes: &[f64], vwaps: &[f64]) -> BarSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 5, 0, 0).unwrap();
        let bars = volumes
            .iter()
            .zip(vwaps)
            .enumerate()
            .map(|(i, (&v, &vw))| {
                Bar::new(start + Duration::days(i as i64), None, Some(vw * 1.01), Some(vw), v)
            })
            .collect();
        BarSeries::from_sorted(bars).unwrap()
    }

    #[test]
    fn test_first_row_has_no_values() {
        let s = series(&[100.0, 200.0], &[10.0, 11.0]);
        let rows = compute_signals(&s, 20, PriceField::Vwap);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].avg_volume_baseline, None);
        assert_eq!(rows[0].volume_ratio, None);
        assert_eq!(rows[0].price_change_pct, None);
        assert_relative_eq!(rows[1].volume_ratio.unwrap(), 2.0);
        assert_relative_eq!(rows[1].price_change_pct.unwrap(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_baseline_is_no_value() {
        let s = series(&[0.0, 0.0, 500.0], &[10.0, 10.0, 10.0]);
        let rows = compute_signals(&s, 20, PriceField::Vwap);

        assert_eq!(rows[1].avg_volume_baseline, Some(0.0));
        assert_eq!(rows[1].volume_ratio, None);
        assert_eq!(rows[2].volume_ratio, None);
    }

    #[test]
    fn test_window_slides() {
        let s = series(&[100.0, 100.0, 400.0, 700.0], &[1.0; 4]);
        let rows = compute_signals(&s, 2, PriceField::Vwap);

        assert_eq!(rows[3].avg_volume_baseline, Some(250.0));
        assert_relative_eq!(rows[3].volume_ratio.unwrap(), 2.8);
    }

    #[test]
    fn test_missing_volume_is_skipped() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 5, 0, 0).unwrap();
        let volumes = [Some(100.0), None, Some(300.0), Some(400.0)];
        let bars = volumes
            .iter()
            .enumerate()
            .map(|(i, &v)| Bar::new(start + Duration::days(i as i64), None, None, Some(10.0), v))
            .collect();
        let s = BarSeries::from_sorted(bars).unwrap();
        let rows = compute_signals(&s, 20, PriceField::Vwap);

        assert_eq!(rows[1].avg_volume_baseline, Some(100.0));
        assert_eq!(rows[1].volume_ratio, None);
        assert_eq!(rows[2].avg_volume_baseline, Some(100.0));
        assert_relative_eq!(rows[2].volume_ratio.unwrap(), 3.0);
        assert_eq!(rows[3].avg_volume_baseline, Some(200.0));
    }

    #[test]
    fn test_close_reference_price() {
        let s = series(&[100.0, 100.0], &[10.0, 20.0]);
        let rows = compute_signals(&s, 20, PriceField::Close);

        assert_relative_eq!(rows[1].reference_price.unwrap(), 20.2);
        assert_relative_eq!(rows[1].price_change_pct.unwrap(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_series() {
        let s = BarSeries::empty();
        assert!(compute_signals(&s, 20, PriceField::Vwap).is_empty());
    }
}
