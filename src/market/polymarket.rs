//! Polymarket keyword search.
//!
//! Queries the Gamma API first and falls back to the CLOB markets listing
//! when Gamma errors or returns nothing. Both return loosely shaped JSON,
//! so records are read field by field with fallbacks rather than through
//! a fixed struct.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::{HttpConfig, MarketsConfig};
use crate::data::http::{as_number, num_field, str_field, HttpFetcher};
use crate::error::FetchError;
use crate::market::models::{MarketObservation, MarketRecord, Platform};
use crate::market::{MarketSource, PlatformFetch};

const MAX_TICKER_CHARS: usize = 20;
const MAX_TITLE_CHARS: usize = 120;

pub struct PolymarketClient {
    http: HttpFetcher,
    gamma_base_url: String,
    clob_base_url: String,
    queries: Vec<String>,
    page_limit: u32,
}

impl PolymarketClient {
    pub fn new(markets: &MarketsConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            http: HttpFetcher::new(&http.user_agent, http.markets_timeout())?,
            gamma_base_url: markets.gamma_base_url.trim_end_matches('/').to_string(),
            clob_base_url: markets.clob_base_url.trim_end_matches('/').to_string(),
            queries: markets.polymarket_queries.clone(),
            page_limit: markets.page_limit,
        })
    }

    async fn fetch_query(&self, keyword: &str) -> Result<Vec<Value>, FetchError> {
        let gamma_url = format!("{}/markets", self.gamma_base_url);
        let primary = self
            .http
            .get_json(
                &gamma_url,
                &[
                    ("active", "true".to_string()),
                    ("closed", "false".to_string()),
                    ("limit", self.page_limit.to_string()),
                    ("keyword", keyword.to_string()),
                ],
            )
            .await
            .map(extract_items);

        match primary {
            Ok(items) if !items.is_empty() => return Ok(items),
            Ok(_) => debug!(query = keyword, "Gamma returned no markets, trying CLOB"),
            Err(e) => warn!(query = keyword, error = %e, "Gamma query failed, trying CLOB"),
        }

        let clob_url = format!("{}/markets", self.clob_base_url);
        let fallback = self
            .http
            .get_json(
                &clob_url,
                &[
                    ("next_cursor", String::new()),
                    ("keyword", keyword.to_string()),
                ],
            )
            .await?;
        Ok(extract_items(fallback))
    }
}

#[async_trait]
impl MarketSource for PolymarketClient {
    fn platform(&self) -> Platform {
        Platform::Polymarket
    }

    #[instrument(skip(self, now), fields(platform = "polymarket"))]
    async fn fetch(&self, now: DateTime<Utc>) -> PlatformFetch {
        let mut out = PlatformFetch::default();
        let mut seen: HashSet<String> = HashSet::new();

        for query in &self.queries {
            let items = match self.fetch_query(query).await {
                Ok(items) => items,
                Err(e) => {
                    warn!(query = %query, error = %e, "Polymarket query failed, skipping");
                    out.failed_queries.push(query.clone());
                    continue;
                }
            };
            info!(query = %query, results = items.len(), "Polymarket query");

            for item in &items {
                let Some(obs) = convert_market(item) else {
                    continue;
                };
                if !seen.insert(obs.ticker.clone()) {
                    continue;
                }
                let record = MarketRecord::from_observation(obs, now);
                if record.is_relevant() {
                    out.records.push(record);
                }
            }
        }

        info!(
            markets = out.records.len(),
            failed_queries = out.failed_queries.len(),
            "Polymarket ag markets found"
        );
        out
    }
}

/// Market list from either a bare array or a `results`/`markets`/`data` wrapper.
fn extract_items(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => ["results", "markets", "data"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Parse a JSON-encoded string array like "[\"a\", \"b\"]" into Vec<String>.
fn parse_json_string_array(s: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(s).unwrap_or_default()
}

/// Ids come back as strings or numbers depending on the endpoint.
fn id_field(m: &Value) -> Option<String> {
    ["id", "condition_id", "conditionId", "marketMakerAddress"]
        .iter()
        .filter_map(|k| m.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// Yes probability as a 0..1 price: outcome prices, then the first token,
/// then the book.
fn yes_price(m: &Value) -> Option<f64> {
    let from_outcomes = match m.get("outcomePrices") {
        Some(Value::String(s)) => parse_json_string_array(s)
            .first()
            .and_then(|p| p.trim().parse::<f64>().ok()),
        Some(Value::Array(prices)) => prices.first().and_then(as_number),
        _ => None,
    };

    from_outcomes
        .or_else(|| {
            m.get("tokens")
                .and_then(Value::as_array)
                .and_then(|tokens| tokens.first())
                .and_then(|token| token.get("price"))
                .and_then(as_number)
        })
        .or_else(|| num_field(m, &["bestBid", "lastTradePrice"]).filter(|p| *p > 0.0))
}

fn convert_market(m: &Value) -> Option<MarketObservation> {
    let id = id_field(m)?;
    let question = str_field(m, &["question", "title", "description"])?;

    let yes = yes_price(m)
        .map(|p| (p * 100.0).round().clamp(0.0, 100.0) as u8)
        .unwrap_or(50);

    let url = match str_field(m, &["url"]) {
        Some(url) => url.to_string(),
        None => {
            let slug = str_field(m, &["slug"]).unwrap_or(id.as_str());
            format!("https://polymarket.com/event/{slug}")
        }
    };

    Some(MarketObservation {
        platform: Platform::Polymarket,
        ticker: truncate_chars(&id, MAX_TICKER_CHARS),
        title: truncate_chars(question, MAX_TITLE_CHARS),
        yes,
        no: 100 - yes,
        volume_24h: num_field(m, &["volume24hr", "volume", "volumeNum"])
            .unwrap_or(0.0)
            .max(0.0),
        close_time: str_field(m, &["endDate", "end_date_iso"])
            .unwrap_or_default()
            .to_string(),
        url,
    })
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
