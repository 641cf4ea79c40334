use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::AppConfig;
use crate::output::{read_json, write_json_atomic};
use crate::prices::models::PricesReport;
use crate::prices::refresh::refresh_quotes;
use crate::prices::symbols::SYMBOLS;
use crate::prices::yahoo::YahooClient;

/// Refresh every symbol from Yahoo and publish `prices.json`, carrying
/// forward the previous value of any symbol that failed.
pub async fn run(config: &AppConfig, now: DateTime<Utc>) -> Result<PricesReport> {
    let path = config.output.prices_path();
    let previous: Option<PricesReport> = read_json(&path).await;

    let provider = YahooClient::new(&config.prices, &config.http).context("Failed to build Yahoo client")?;
    let report = refresh_quotes(&provider, &SYMBOLS, previous.as_ref(), now).await?;

    write_json_atomic(&path, &report).await?;
    info!(
        path = %path.display(),
        succeeded = report.succeeded,
        stale = report.stale.len(),
        "Prices published"
    );
    Ok(report)
}
