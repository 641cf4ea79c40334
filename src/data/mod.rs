pub mod http;
pub mod news;
pub mod weather;

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::data::news::Headline;
use crate::data::weather::StationForecast;
use crate::market::ranking::rank_by_relevance;

/// One observation from a context source.
#[derive(Debug, Clone)]
pub enum DataPoint {
    Headline(Headline),
    Forecast(StationForecast),
}

/// A source of briefing context (news feeds, weather).
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch everything this source has. An `Err` means the whole source
    /// produced nothing usable.
    async fn fetch(&self) -> Result<Vec<DataPoint>>;

    /// Human-readable name of this data source.
    fn name(&self) -> &str;
}

/// Context gathered from every source, deduplicated.
#[derive(Debug, Default)]
pub struct Gathered {
    /// Most relevant first, unique by normalized title.
    pub headlines: Vec<Headline>,
    pub forecasts: Vec<StationForecast>,
    pub failed_sources: Vec<String>,
}

/// Runs sources in order and merges what they return.
pub struct DataAggregator {
    sources: Vec<Box<dyn DataSource>>,
}

impl DataAggregator {
    pub fn new(sources: Vec<Box<dyn DataSource>>) -> Self {
        Self { sources }
    }

    pub async fn fetch_all(&self) -> Gathered {
        let mut gathered = Gathered::default();
        let mut seen_titles: HashSet<String> = HashSet::new();

        for source in &self.sources {
            match source.fetch().await {
                Ok(points) => {
                    info!(source = source.name(), points = points.len(), "Data fetched");
                    for point in points {
                        match point {
                            DataPoint::Headline(h) => {
                                if h.is_relevant() && seen_titles.insert(normalize_title(&h.title)) {
                                    gathered.headlines.push(h);
                                }
                            }
                            DataPoint::Forecast(f) => gathered.forecasts.push(f),
                        }
                    }
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Data source fetch failed");
                    gathered.failed_sources.push(source.name().to_string());
                }
            }
        }

        rank_by_relevance(&mut gathered.headlines, |h| h.relevance);
        gathered
    }
}

/// Lower-cased alphanumeric words, so punctuation and spacing differences
/// between feeds don't defeat deduplication.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
