pub mod category;
pub mod kalshi;
pub mod models;
pub mod polymarket;
pub mod ranking;
pub mod relevance;
pub mod scanner;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::market::models::{MarketRecord, Platform};

/// Result of one platform's pass over its query list.
#[derive(Debug, Default)]
pub struct PlatformFetch {
    /// Deduplicated records that passed the relevance threshold, in fetch order.
    pub records: Vec<MarketRecord>,
    /// Queries that produced no usable response.
    pub failed_queries: Vec<String>,
}

/// A prediction-market platform searched by keyword.
#[async_trait]
pub trait MarketSource: Send + Sync {
    fn platform(&self) -> Platform;

    /// Run every configured query in order. Per-query failures are logged
    /// and recorded, never propagated.
    async fn fetch(&self, now: DateTime<Utc>) -> PlatformFetch;
}
