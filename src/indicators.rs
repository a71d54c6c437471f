//! Rolling calculations
//!
//! Outputs are aligned with their inputs; `None` marks positions where the
//! value is undefined.

use crate::error::{BreakoutError, Result};

/// Mean of the present values among the `window` positions strictly before
/// each position.
///
/// Missing values are skipped; a position whose window holds no value at all
/// (always the case for position 0) yields `None`. Early positions use however
/// many prior values exist.
pub fn trailing_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());

    if window == 0 {
        result.resize(values.len(), None);
        return result;
    }

    for i in 0..values.len() {
        let start = i.saturating_sub(window);
        let (sum, count) = values[start..i]
            .iter()
            .flatten()
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        result.push((count > 0).then(|| sum / count as f64));
    }

    result
}

/// `numerator / denominator`, undefined for a zero or non-finite denominator
pub fn ratio(numerator: f64, denominator: f64) -> Result<f64> {
    if denominator == 0.0 || !denominator.is_finite() {
        return Err(BreakoutError::DivisionUndefined(denominator));
    }
    Ok(numerator / denominator)
}

/// Percentage change from `from` to `to`
pub fn percent_change(from: f64, to: f64) -> Result<f64> {
    ratio(to - from, from).map(|r| r * 100.0)
}

/// Percentage change of each value versus the previous one.
///
/// Undefined at position 0, next to a missing value, or after a zero.
pub fn pct_change(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        let change = if i == 0 {
            None
        } else {
            match (values[i - 1], values[i]) {
                (Some(prev), Some(curr)) => percent_change(prev, curr).ok(),
                _ => None,
            }
        };
        result.push(change);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_trailing_mean_excludes_current() {
        let values = vec![Some(100.0), Some(500.0), Some(300.0), Some(1000.0)];
        let result = trailing_mean(&values, 2);

        assert_eq!(result[0], None);
        assert_eq!(result[1], Some(100.0));
        assert_eq!(result[2], Some(300.0));
        assert_eq!(result[3], Some(400.0));
    }

    #[test]
    fn test_trailing_mean_partial_window() {
        let values = vec![Some(10.0), Some(20.0), Some(30.0)];
        let result = trailing_mean(&values, 20);

        assert_eq!(result, vec![None, Some(10.0), Some(15.0)]);
    }

    #[test]
    fn test_trailing_mean_skips_missing() {
        let values = vec![Some(100.0), None, Some(300.0), Some(500.0), None];
        let result = trailing_mean(&values, 2);

        assert_eq!(result[1], Some(100.0));
        // window [None, 300]
        assert_eq!(result[3], Some(300.0));
        assert_eq!(result[4], Some(400.0));

        let gaps = trailing_mean(&[Some(1.0), None, None, Some(4.0)], 2);
        assert_eq!(gaps, vec![None, Some(1.0), Some(1.0), None]);
    }

    #[test]
    fn test_ratio_zero_denominator() {
        assert_eq!(ratio(5.0, 0.0), Err(BreakoutError::DivisionUndefined(0.0)));
        assert!(ratio(5.0, f64::NAN).is_err());
    }

    #[test]
    fn test_pct_change() {
        let values = vec![Some(10.0), Some(10.5), None, Some(11.0), Some(0.0), Some(1.0)];
        let result = pct_change(&values);

        assert_eq!(result[0], None);
        assert_relative_eq!(result[1].unwrap(), 5.0, epsilon = 1e-12);
        assert_eq!(result[2], None);
        assert_eq!(result[3], None);
        assert_relative_eq!(result[4].unwrap(), -100.0);
        assert_eq!(result[5], None);
    }
}
