//! Yahoo Finance chart API, one request per symbol.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::config::{HttpConfig, PricesConfig};
use crate::data::http::HttpFetcher;
use crate::error::FetchError;
use crate::prices::models::Quote;
use crate::prices::symbols::SymbolSpec;
use crate::prices::{QuoteBatch, QuoteProvider};

pub struct YahooClient {
    http: HttpFetcher,
    base_url: String,
    range: String,
}

impl YahooClient {
    pub fn new(prices: &PricesConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            http: HttpFetcher::new(&http.user_agent, http.prices_timeout())?,
            base_url: prices.yahoo_base_url.trim_end_matches('/').to_string(),
            range: prices.history_range.clone(),
        })
    }

    async fn fetch_one(&self, spec: &SymbolSpec, now: DateTime<Utc>) -> Result<Quote, FetchError> {
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.base_url,
            urlencoding::encode(spec.symbol)
        );
        let body = self
            .http
            .get_json(
                &url,
                &[("range", self.range.clone()), ("interval", "1d".to_string())],
            )
            .await?;

        let chart: ChartResponse =
            serde_json::from_value(body).map_err(|e| FetchError::parse(&url, e))?;
        let result = chart
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| FetchError::parse(&url, "chart has no result"))?;

        let daily = DailyBars::from_result(&result);
        let (close, open, prev_close) = daily
            .latest_and_previous()
            .or_else(|| {
                let close = result.meta.regular_market_price?;
                let prev = result.meta.previous_close().unwrap_or(close);
                Some((close, close, prev))
            })
            .ok_or_else(|| FetchError::parse(&url, "no closing prices"))?;

        Ok(Quote::from_closes(spec, close, open, prev_close, now))
    }
}

#[async_trait]
impl QuoteProvider for YahooClient {
    fn source(&self) -> &'static str {
        "Yahoo Finance chart API (free, no API key)"
    }

    #[instrument(skip_all, fields(provider = "yahoo", symbols = symbols.len()))]
    async fn fetch_quotes(&self, symbols: &[SymbolSpec], now: DateTime<Utc>) -> QuoteBatch {
        let mut batch = QuoteBatch::default();

        for spec in symbols {
            match self.fetch_one(spec, now).await {
                Ok(quote) => {
                    info!(
                        key = spec.key,
                        symbol = spec.symbol,
                        close = quote.close,
                        change = quote.net_change,
                        "Quote fetched"
                    );
                    batch.quotes.insert(spec.key.to_string(), quote);
                }
                Err(e) => {
                    warn!(key = spec.key, symbol = spec.symbol, error = %e, "Quote fetch failed");
                    batch.failed.push(spec.key.to_string());
                }
            }
        }

        batch
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
}

impl ChartMeta {
    fn previous_close(&self) -> Option<f64> {
        self.chart_previous_close.or(self.previous_close)
    }
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<OhlcSeries>,
}

/// Bars are null on holidays and for the still-forming session.
#[derive(Debug, Default, Deserialize)]
struct OhlcSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

struct DailyBars {
    /// (open, close) for bars that have a close.
    bars: Vec<(Option<f64>, f64)>,
    meta_prev_close: Option<f64>,
}

impl DailyBars {
    fn from_result(result: &ChartResult) -> Self {
        let bars = result
            .indicators
            .quote
            .first()
            .map(|series| {
                series
                    .close
                    .iter()
                    .enumerate()
                    .filter_map(|(i, close)| {
                        let close = (*close)?;
                        Some((series.open.get(i).copied().flatten(), close))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            bars,
            meta_prev_close: result.meta.previous_close(),
        }
    }

    /// (close, open, previous close) from the last two closed bars. With a
    /// single bar, the previous close comes from the chart metadata.
    fn latest_and_previous(&self) -> Option<(f64, f64, f64)> {
        let (open, close) = *self.bars.last()?;
        let prev = match self.bars.len() {
            1 => self.meta_prev_close.unwrap_or(close),
            n => self.bars[n - 2].1,
        };
        Some((close, open.unwrap_or(close), prev))
    }
}
