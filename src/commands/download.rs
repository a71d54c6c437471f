//! Download and API key commands

use anyhow::Result;
use tracing::info;
use volume_breakout::data::{save_records_json, PolygonClient};
use volume_breakout::Config;

pub fn run(
    config_path: Option<String>,
    ticker: String,
    start: Option<String>,
    end: Option<String>,
    output: Option<String>,
) -> Result<()> {
    let config = Config::load(config_path.as_deref())?;
    let (start, end) = super::date_range(start.as_deref(), end.as_deref())?;

    let client = PolygonClient::from_config(&config.polygon)?;
    let records = client.fetch_daily_bars(&ticker, start, end)?;

    if records.is_empty() {
        anyhow::bail!("No data fetched for {}", ticker.to_uppercase());
    }

    let output = output.unwrap_or_else(|| format!("data/{}_1d.json", ticker.to_uppercase()));
    let path = save_records_json(&records, &output)?;
    info!("Download complete: {}", path.display());

    Ok(())
}

pub fn validate_key(config_path: Option<String>, key: Option<String>) -> Result<()> {
    let mut config = Config::load(config_path.as_deref())?;
    if key.is_some() {
        config.polygon.api_key = key;
    }

    let client = PolygonClient::from_config(&config.polygon)?;
    if client.is_api_key_valid() {
        println!("API Key is valid!");
        Ok(())
    } else {
        anyhow::bail!("Invalid API Key. Please check and try again.")
    }
}
