//! Barchart OnDemand `getQuote`, one batched request for the briefing contracts.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::config::{BriefingConfig, HttpConfig};
use crate::data::http::HttpFetcher;
use crate::error::FetchError;
use crate::prices::models::Quote;
use crate::prices::symbols::SymbolSpec;
use crate::prices::{QuoteBatch, QuoteProvider};

const QUOTE_FIELDS: &str =
    "symbol,name,lastPrice,openPrice,previousClose,netChange,percentChange,tradeTime";

pub struct BarchartClient {
    http: HttpFetcher,
    base_url: String,
    api_key: SecretString,
}

impl BarchartClient {
    pub fn new(briefing: &BriefingConfig, http: &HttpConfig, api_key: SecretString) -> Result<Self> {
        Ok(Self {
            http: HttpFetcher::new(&http.user_agent, http.prices_timeout())?,
            base_url: briefing.barchart_base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn get_quotes(&self, barchart_symbols: &[&str]) -> Result<Vec<BarchartQuote>, FetchError> {
        let url = format!("{}/getQuote.json", self.base_url);
        let body = self
            .http
            .get_json(
                &url,
                &[
                    ("apikey", self.api_key.expose_secret().to_string()),
                    ("symbols", barchart_symbols.join(",")),
                    ("fields", QUOTE_FIELDS.to_string()),
                ],
            )
            .await?;

        let data: QuoteResponse =
            serde_json::from_value(body).map_err(|e| FetchError::parse(&url, e))?;
        match data.status.code {
            200 => Ok(data.results),
            code => Err(FetchError::parse(
                &url,
                format!("status code {code}: {}", data.status.message.unwrap_or_default()),
            )),
        }
    }
}

#[async_trait]
impl QuoteProvider for BarchartClient {
    fn source(&self) -> &'static str {
        "Barchart OnDemand getQuote"
    }

    #[instrument(skip_all, fields(provider = "barchart", symbols = symbols.len()))]
    async fn fetch_quotes(&self, symbols: &[SymbolSpec], now: DateTime<Utc>) -> QuoteBatch {
        let mut batch = QuoteBatch::default();
        let mapped: Vec<(&SymbolSpec, &str)> = symbols
            .iter()
            .filter_map(|s| s.barchart.map(|b| (s, b)))
            .collect();

        for spec in symbols.iter().filter(|s| s.barchart.is_none()) {
            warn!(key = spec.key, "No Barchart symbol mapped");
            batch.failed.push(spec.key.to_string());
        }
        if mapped.is_empty() {
            return batch;
        }

        let requested: Vec<&str> = mapped.iter().map(|(_, b)| *b).collect();
        let results = match self.get_quotes(&requested).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "Barchart request failed");
                batch
                    .failed
                    .extend(mapped.iter().map(|(s, _)| s.key.to_string()));
                return batch;
            }
        };

        let by_symbol: HashMap<&str, &BarchartQuote> =
            results.iter().map(|q| (q.symbol.as_str(), q)).collect();

        for (spec, barchart_symbol) in mapped {
            match by_symbol.get(barchart_symbol).and_then(|q| q.to_quote(spec, now)) {
                Some(quote) => {
                    info!(key = spec.key, symbol = barchart_symbol, close = quote.close, "Quote fetched");
                    batch.quotes.insert(spec.key.to_string(), quote);
                }
                None => {
                    warn!(key = spec.key, symbol = barchart_symbol, "Symbol missing from Barchart response");
                    batch.failed.push(spec.key.to_string());
                }
            }
        }

        batch
    }
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    status: QuoteStatus,
    #[serde(default)]
    results: Vec<BarchartQuote>,
}

#[derive(Debug, Deserialize)]
struct QuoteStatus {
    code: u16,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BarchartQuote {
    #[serde(default)]
    symbol: String,
    last_price: Option<f64>,
    open_price: Option<f64>,
    previous_close: Option<f64>,
    net_change: Option<f64>,
}

impl BarchartQuote {
    /// Previous close falls back to last price minus the reported change.
    fn to_quote(&self, spec: &SymbolSpec, now: DateTime<Utc>) -> Option<Quote> {
        let close = self.last_price?;
        let prev_close = self
            .previous_close
            .or_else(|| self.net_change.map(|chg| close - chg))
            .unwrap_or(close);
        let open = self.open_price.unwrap_or(close);
        Some(Quote::from_closes(spec, close, open, prev_close, now))
    }
}
