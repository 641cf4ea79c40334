pub mod barchart;
pub mod models;
pub mod refresh;
pub mod symbols;
pub mod yahoo;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::prices::models::Quote;
use crate::prices::symbols::SymbolSpec;

/// Quotes keyed by symbol key, plus the keys that produced nothing.
#[derive(Debug, Default)]
pub struct QuoteBatch {
    pub quotes: BTreeMap<String, Quote>,
    pub failed: Vec<String>,
}

/// A futures quote upstream.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Attribution written into the output document.
    fn source(&self) -> &'static str;

    /// Fetch every symbol in `symbols`. Per-symbol failures land in
    /// `QuoteBatch::failed` and are never propagated.
    async fn fetch_quotes(&self, symbols: &[SymbolSpec], now: DateTime<Utc>) -> QuoteBatch;
}
