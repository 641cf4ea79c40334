use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::market::models::MarketsReport;
use crate::market::scanner::MarketScanner;
use crate::output::write_json_atomic;

/// Scan Kalshi and Polymarket and publish `markets.json`.
pub async fn run(config: &AppConfig, now: DateTime<Utc>) -> Result<MarketsReport> {
    let scanner = MarketScanner::from_config(config).context("Failed to build market scanner")?;
    let report = scanner.scan(now).await;

    if report.markets.is_empty() {
        warn!("No relevant markets found, publishing an empty list");
    }

    let path = config.output.markets_path();
    write_json_atomic(&path, &report).await?;
    info!(path = %path.display(), count = report.count, total = report.total, "Markets published");
    Ok(report)
}
