//! Data loading and management
//!
//! Turns raw provider records into a [`BarSeries`], loads raw records from
//! JSON/CSV files and fetches daily aggregates from the Polygon.io API.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use itertools::Itertools;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;
use tracing::{debug, info, warn};

use crate::config::PolygonConfig;
use crate::error::BreakoutError;
use crate::{Bar, BarSeries, PriceField, RawRecord};

/// Polygon aggregate field names
pub mod fields {
    pub const VOLUME: &str = "v";
    pub const VWAP: &str = "vw";
    pub const OPEN: &str = "o";
    pub const CLOSE: &str = "c";
    pub const TIMESTAMP: &str = "t";
}

// =============================================================================
// Normalization
// =============================================================================

/// Validate raw records and build an ascending [`BarSeries`].
///
/// Every record needs a `timestamp` (Unix milliseconds). The `volume` and
/// `price_field` columns must appear in at least one record; a single row
/// without them gets `None` there and yields no signal values for that day.
/// Other fields are kept on [`Bar::extra`]; a volume/open/close/vwap value that
/// is not a number is treated as missing and kept there too, and so is a
/// negative volume.
pub fn normalize(records: &[RawRecord], price_field: PriceField) -> crate::Result<BarSeries> {
    if records.is_empty() {
        return Err(BreakoutError::malformed("no bar records"));
    }

    let required = [fields::VOLUME, fields::TIMESTAMP, price_field.record_key()];
    for key in required {
        if !records.iter().any(|r| r.contains_key(key)) {
            return Err(BreakoutError::malformed(format!(
                "required field '{}' is absent from every record",
                key
            )));
        }
    }

    let mut bars = records
        .iter()
        .enumerate()
        .map(|(row, record)| bar_from_record(row, record))
        .collect::<crate::Result<Vec<Bar>>>()?;

    bars.sort_by_key(|b| b.timestamp);

    if let Some((a, _)) = bars.iter().tuple_windows().find(|(a, b)| a.date == b.date) {
        return Err(BreakoutError::malformed(format!(
            "duplicate bar for {}",
            a.date
        )));
    }

    let passthrough = bars.iter().filter(|b| !b.extra.is_empty()).count();
    debug!(bars = bars.len(), passthrough, "normalized bar records");

    BarSeries::from_sorted(bars)
}

fn bar_from_record(row: usize, record: &RawRecord) -> crate::Result<Bar> {
    let millis = record
        .get(fields::TIMESTAMP)
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .ok_or_else(|| BreakoutError::malformed(format!("row {}: missing timestamp", row)))?;
    let timestamp = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        BreakoutError::malformed(format!("row {}: timestamp {} out of range", row, millis))
    })?;

    let mut extra = BTreeMap::new();
    let mut optional = |key: &str| -> Option<f64> {
        let value = record.get(key)?;
        match value.as_f64() {
            Some(v) => Some(v),
            None => {
                if !value.is_null() {
                    warn!("row {}: non-numeric '{}' kept as is", row, key);
                }
                extra.insert(key.to_string(), value.clone());
                None
            }
        }
    };

    let open = optional(fields::OPEN);
    let close = optional(fields::CLOSE);
    let vwap = optional(fields::VWAP);
    let volume = match optional(fields::VOLUME) {
        Some(v) if v < 0.0 => {
            warn!("row {}: negative volume ({}) treated as missing", row, v);
            extra.insert(fields::VOLUME.to_string(), Value::from(v));
            None
        }
        other => other,
    };

    let known = [
        fields::VOLUME,
        fields::TIMESTAMP,
        fields::OPEN,
        fields::CLOSE,
        fields::VWAP,
    ];
    for (key, value) in record {
        if !known.contains(&key.as_str()) {
            extra.insert(key.clone(), value.clone());
        }
    }

    let mut bar = Bar::new(timestamp, open, close, vwap, volume);
    bar.extra = extra;
    Ok(bar)
}

// =============================================================================
// Raw record files
// =============================================================================

/// Parse raw records from JSON: a bare array of objects, or a Polygon
/// aggregates response with a `results` array.
pub fn parse_records_json(text: &str) -> Result<Vec<RawRecord>> {
    let value: Value = serde_json::from_str(text).context("Failed to parse JSON")?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("results") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => anyhow::bail!("'results' is not an array"),
        },
        _ => anyhow::bail!("Expected an array of records or an object with 'results'"),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(record) => Ok(record),
            other => anyhow::bail!("Record {} is not an object: {}", i, other),
        })
        .collect()
}

/// Load raw records from a JSON file
pub fn load_records_json(path: impl AsRef<Path>) -> Result<Vec<RawRecord>> {
    let text = std::fs::read_to_string(path.as_ref()).context("Failed to read JSON file")?;
    parse_records_json(&text)
}

/// Read raw records from CSV with a header row of field names.
///
/// Numeric cells become numbers, empty cells are omitted, anything else is
/// kept as a string.
pub fn read_records_csv<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers().context("Missing CSV header row")?.clone();

    let mut records = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let row = result.context(format!("Failed to read row {}", row_idx + 1))?;

        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .filter(|(_, cell)| !cell.trim().is_empty())
            .map(|(name, cell)| (name.trim().to_string(), cell_value(cell.trim())))
            .collect();
        records.push(record);
    }

    Ok(records)
}

fn cell_value(cell: &str) -> Value {
    if let Ok(i) = cell.parse::<i64>() {
        return Value::from(i);
    }
    match cell.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::from(f),
        _ => Value::String(cell.to_string()),
    }
}

/// Load raw records from a CSV file
pub fn load_records_csv(path: impl AsRef<Path>) -> Result<Vec<RawRecord>> {
    let file = File::open(path.as_ref()).context("Failed to open CSV file")?;
    read_records_csv(BufReader::new(file))
}

/// Load raw records, picking the format from the file extension
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<RawRecord>> {
    let path = path.as_ref();
    let records = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => load_records_csv(path)?,
        _ => load_records_json(path)?,
    };

    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Save raw records as a JSON array
pub fn save_records_json(records: &[RawRecord], path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    let file = File::create(&path).context("Failed to create output file")?;
    serde_json::to_writer_pretty(BufWriter::new(file), records)
        .context("Failed to write records")?;

    info!("Saved {} records to {}", records.len(), path.display());
    Ok(path)
}

// =============================================================================
// Polygon.io fetcher
// =============================================================================

#[derive(Debug, serde::Deserialize)]
struct AggregatesResponse {
    #[serde(default)]
    results: Option<Vec<RawRecord>>,
    #[serde(default)]
    next_url: Option<String>,
}

/// Daily aggregate bars from the Polygon.io REST API
pub struct PolygonClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl PolygonClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(StdDuration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        let base_url: String = base_url.into();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &PolygonConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .context("No Polygon API key: set POLYGON_API_KEY or polygon.api_key")?;
        Self::new(config.base_url.clone(), api_key, config.timeout_secs)
    }

    /// First page URL for daily aggregates of `ticker` over `[start, end]`
    pub fn aggregates_url(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/aggs/ticker/{}/range/1/day/{}/{}?adjusted=true&sort=asc",
            self.base_url,
            ticker.to_uppercase(),
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        )
    }

    /// Fetch all pages of daily bars, following `next_url`.
    ///
    /// A non-success response ends pagination; records fetched so far are returned.
    pub fn fetch_daily_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawRecord>> {
        info!("Fetching {} daily bars from {} to {}", ticker.to_uppercase(), start, end);

        let mut records = Vec::new();
        let mut next_url = Some(self.aggregates_url(ticker, start, end));

        while let Some(url) = next_url.take() {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.api_key)
                .send()
                .context("Failed to send request")?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                warn!("Polygon returned {}: {}", status, body);
                break;
            }

            let page: AggregatesResponse = response.json().context("Failed to parse response")?;
            let results = page.results.unwrap_or_default();
            debug!("  Fetched page with {} bars", results.len());

            records.extend(results);
            next_url = page.next_url;
        }

        info!("Total bars fetched: {}", records.len());
        Ok(records)
    }

    /// Check the key with a lightweight authenticated request
    pub fn is_api_key_valid(&self) -> bool {
        let url = format!("{}/aggs/ticker/AAPL/prev", self.base_url);
        match self.client.get(&url).bearer_auth(&self.api_key).send() {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("API key check failed: {}", e);
                false
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
