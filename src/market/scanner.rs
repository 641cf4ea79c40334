//! Market discovery across platforms.
//!
//! Each platform's relevant markets are ranked and capped on their own,
//! then merged, re-ranked and capped again for the published list.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::market::kalshi::KalshiClient;
use crate::market::models::{MarketRecord, MarketsReport, Tier, TierBreakdown};
use crate::market::polymarket::PolymarketClient;
use crate::market::ranking::rank;
use crate::market::MarketSource;

pub struct MarketScanner {
    sources: Vec<Box<dyn MarketSource>>,
    max_per_platform: usize,
    max_total: usize,
}

impl MarketScanner {
    pub fn new(sources: Vec<Box<dyn MarketSource>>, max_per_platform: usize, max_total: usize) -> Self {
        Self {
            sources,
            max_per_platform,
            max_total,
        }
    }

    /// Kalshi then Polymarket, as configured.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let sources: Vec<Box<dyn MarketSource>> = vec![
            Box::new(KalshiClient::new(&config.markets, &config.http)?),
            Box::new(PolymarketClient::new(&config.markets, &config.http)?),
        ];
        Ok(Self::new(
            sources,
            config.markets.max_per_platform,
            config.markets.max_total,
        ))
    }

    /// Scan every platform serially and assemble the published report.
    #[instrument(skip(self, now))]
    pub async fn scan(&self, now: DateTime<Utc>) -> MarketsReport {
        let mut total = 0usize;
        let mut by_platform = BTreeMap::new();
        let mut combined: Vec<MarketRecord> = Vec::new();

        for source in &self.sources {
            let platform = source.platform();
            let mut fetched = source.fetch(now).await;

            if !fetched.failed_queries.is_empty() {
                warn!(
                    platform = %platform,
                    failed = ?fetched.failed_queries,
                    "Some queries returned nothing usable"
                );
            }

            total += fetched.records.len();
            rank(&mut fetched.records);
            fetched.records.truncate(self.max_per_platform);

            by_platform.insert(platform.to_string(), fetched.records.len());
            combined.extend(fetched.records);
        }

        rank(&mut combined);
        combined.truncate(self.max_total);

        let report = build_report(combined, total, by_platform, now);
        info!(
            total = report.total,
            published = report.count,
            tier1 = report.tiers.tier1,
            tier2 = report.tiers.tier2,
            tier3 = report.tiers.tier3,
            "Market scan complete"
        );
        for m in report.markets.iter().take(5) {
            info!(
                platform = %m.platform,
                relevance = m.relevance,
                yes = m.yes,
                title = %m.title,
                "Top market"
            );
        }
        report
    }
}

/// Tier counts and category groupings over already-ranked markets.
pub fn build_report(
    markets: Vec<MarketRecord>,
    total: usize,
    by_platform: BTreeMap<String, usize>,
    fetched: DateTime<Utc>,
) -> MarketsReport {
    let mut tiers = TierBreakdown::default();
    let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for m in &markets {
        match m.tier {
            Tier::Direct => tiers.tier1 += 1,
            Tier::TradePolicy => tiers.tier2 += 1,
            Tier::MacroWeather => tiers.tier3 += 1,
            Tier::None => {}
        }
        categories
            .entry(m.category.to_string())
            .or_default()
            .push(m.ticker.clone());
    }

    MarketsReport {
        fetched,
        total,
        count: markets.len(),
        by_platform,
        tiers,
        categories,
        markets,
    }
}
