//! Configuration management
//!
//! Analysis parameters plus the application configuration file. The API key
//! is taken from the environment (optionally via `.env`) when present.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::breakout::ThresholdComparison;
use crate::error::BreakoutError;
use crate::PriceField;

/// Environment variables checked for the Polygon API key, in order
pub const API_KEY_VARS: &[&str] = &["POLYGON_API_KEY", "api_key"];

/// Parameters of a single breakout analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Volume must exceed this percentage of the trailing baseline (200 = 2x)
    pub volume_threshold_pct: f64,
    /// Reference price must rise by more than this percentage
    pub price_threshold_pct: f64,
    /// Trading days between entry and exit
    pub holding_days: usize,
    /// Prior days in the volume baseline
    pub lookback_window: usize,
    pub price_field: PriceField,
    pub comparison: ThresholdComparison,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            volume_threshold_pct: 200.0,
            price_threshold_pct: 2.0,
            holding_days: 10,
            lookback_window: 20,
            price_field: PriceField::Vwap,
            comparison: ThresholdComparison::Strict,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), BreakoutError> {
        if self.holding_days == 0 {
            return Err(BreakoutError::InvalidConfig(
                "holding_days must be a positive integer".to_string(),
            ));
        }
        if self.lookback_window == 0 {
            return Err(BreakoutError::InvalidConfig(
                "lookback_window must be a positive integer".to_string(),
            ));
        }
        if !self.volume_threshold_pct.is_finite() {
            return Err(BreakoutError::InvalidConfig(format!(
                "volume_threshold_pct must be finite, got {}",
                self.volume_threshold_pct
            )));
        }
        if !self.price_threshold_pct.is_finite() {
            return Err(BreakoutError::InvalidConfig(format!(
                "price_threshold_pct must be finite, got {}",
                self.price_threshold_pct
            )));
        }
        Ok(())
    }
}

/// Polygon.io market data settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolygonConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for PolygonConfig {
    fn default() -> Self {
        PolygonConfig {
            base_url: "https://api.polygon.io/v2".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub results_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            results_dir: "results".to_string(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub polygon: PolygonConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        config.apply_env();
        Ok(config)
    }

    /// Load from `path` if given, otherwise start from defaults
    pub fn load(path: Option<impl AsRef<Path>>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let mut config = Config::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    /// Take the API key from the environment if it is set there
    fn apply_env(&mut self) {
        if let Some(key) = API_KEY_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|k| !k.is_empty()))
        {
            self.polygon.api_key = Some(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.volume_threshold_pct, 200.0);
        assert_eq!(config.price_threshold_pct, 2.0);
        assert_eq!(config.holding_days, 10);
        assert_eq!(config.lookback_window, 20);
        assert_eq!(config.price_field, PriceField::Vwap);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_lookback() {
        let config = AnalysisConfig {
            lookback_window: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(BreakoutError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_nan_threshold() {
        let config = AnalysisConfig {
            price_threshold_pct: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "analysis": { "holding_days": 5, "price_field": "close", "comparison": "inclusive" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.analysis.holding_days, 5);
        assert_eq!(config.analysis.lookback_window, 20);
        assert_eq!(config.analysis.price_field, PriceField::Close);
        assert_eq!(config.analysis.comparison, ThresholdComparison::Inclusive);
        assert_eq!(config.polygon.base_url, "https://api.polygon.io/v2");
        assert_eq!(config.output.results_dir, "results");
    }
}
