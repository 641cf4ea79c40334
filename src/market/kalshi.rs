//! Kalshi keyword search over the public markets endpoint (no auth).

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::config::{HttpConfig, MarketsConfig};
use crate::data::http::HttpFetcher;
use crate::error::FetchError;
use crate::market::models::{MarketObservation, MarketRecord, Platform};
use crate::market::{MarketSource, PlatformFetch};

pub struct KalshiClient {
    http: HttpFetcher,
    base_url: String,
    queries: Vec<String>,
    page_limit: u32,
}

impl KalshiClient {
    pub fn new(markets: &MarketsConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            http: HttpFetcher::new(&http.user_agent, http.markets_timeout())?,
            base_url: markets.kalshi_base_url.trim_end_matches('/').to_string(),
            queries: markets.kalshi_queries.clone(),
            page_limit: markets.page_limit,
        })
    }

    async fn fetch_query(&self, keyword: &str) -> Result<Vec<KalshiMarket>, FetchError> {
        let url = format!("{}/markets", self.base_url);
        let body = self
            .http
            .get_json(
                &url,
                &[
                    ("limit", self.page_limit.to_string()),
                    ("status", "open".to_string()),
                    ("keyword", keyword.to_string()),
                ],
            )
            .await?;

        let data: MarketsResponse =
            serde_json::from_value(body).map_err(|e| FetchError::parse(&url, e))?;
        Ok(data.markets)
    }
}

#[async_trait]
impl MarketSource for KalshiClient {
    fn platform(&self) -> Platform {
        Platform::Kalshi
    }

    #[instrument(skip(self, now), fields(platform = "kalshi"))]
    async fn fetch(&self, now: DateTime<Utc>) -> PlatformFetch {
        let mut out = PlatformFetch::default();
        let mut seen: HashSet<String> = HashSet::new();

        for query in &self.queries {
            let items = match self.fetch_query(query).await {
                Ok(items) => items,
                Err(e) => {
                    warn!(query = %query, error = %e, "Kalshi query failed, skipping");
                    out.failed_queries.push(query.clone());
                    continue;
                }
            };
            info!(query = %query, results = items.len(), "Kalshi query");

            for market in &items {
                if market.ticker.is_empty() || seen.contains(&market.ticker) {
                    continue;
                }
                // An unpriced or off-topic sighting must not shadow a later one.
                let Some(obs) = convert_market(market) else {
                    continue;
                };
                let record = MarketRecord::from_observation(obs, now);
                if record.is_relevant() {
                    seen.insert(market.ticker.clone());
                    out.records.push(record);
                }
            }
        }

        info!(
            markets = out.records.len(),
            failed_queries = out.failed_queries.len(),
            "Kalshi ag markets found"
        );
        out
    }
}

#[derive(Debug, Deserialize)]
struct MarketsResponse {
    #[serde(default)]
    markets: Vec<KalshiMarket>,
}

/// Prices are in cents. Newer responses also carry `*_dollars` strings.
#[derive(Debug, Deserialize)]
struct KalshiMarket {
    #[serde(default)]
    ticker: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    yes_bid: Option<f64>,
    #[serde(default)]
    yes_ask: Option<f64>,
    #[serde(default)]
    no_bid: Option<f64>,
    #[serde(default)]
    yes_bid_dollars: Option<String>,
    #[serde(default)]
    yes_ask_dollars: Option<String>,
    #[serde(default)]
    volume_24h: Option<f64>,
    #[serde(default)]
    close_time: Option<String>,
}

impl KalshiMarket {
    fn yes_bid_cents(&self) -> Option<f64> {
        self.yes_bid.or_else(|| dollars_to_cents(self.yes_bid_dollars.as_deref()))
    }

    fn yes_ask_cents(&self) -> Option<f64> {
        self.yes_ask.or_else(|| dollars_to_cents(self.yes_ask_dollars.as_deref()))
    }
}

fn dollars_to_cents(value: Option<&str>) -> Option<f64> {
    value?.trim().parse::<f64>().ok().map(|d| d * 100.0)
}

/// Markets with neither a yes bid nor a yes ask carry no odds and are skipped.
fn convert_market(m: &KalshiMarket) -> Option<MarketObservation> {
    let bid = m.yes_bid_cents();
    let ask = m.yes_ask_cents();
    if bid.is_none() && ask.is_none() {
        return None;
    }

    let bid = bid.unwrap_or(0.0);
    let ask = ask.unwrap_or(0.0);
    let yes = if bid > 0.0 && ask > 0.0 {
        (bid + ask) / 2.0
    } else if bid > 0.0 {
        bid
    } else if ask > 0.0 {
        ask
    } else {
        50.0
    };
    let yes = to_percent(yes);
    let no = m
        .no_bid
        .filter(|n| *n > 0.0)
        .map(to_percent)
        .unwrap_or(100 - yes);

    let title = [m.title.as_deref(), m.subtitle.as_deref()]
        .into_iter()
        .flatten()
        .find(|t| !t.trim().is_empty())
        .unwrap_or(&m.ticker)
        .to_string();

    Some(MarketObservation {
        platform: Platform::Kalshi,
        ticker: m.ticker.clone(),
        title,
        yes,
        no,
        volume_24h: m.volume_24h.unwrap_or(0.0).max(0.0),
        close_time: m.close_time.clone().unwrap_or_default(),
        url: format!("https://kalshi.com/markets/{}", m.ticker),
    })
}

fn to_percent(cents: f64) -> u8 {
    cents.round().clamp(0.0, 100.0) as u8
}
