use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::market::category::{categorize, rationale};
use crate::market::relevance::score;

/// Records scoring below this are dropped before persistence.
pub const MIN_RELEVANCE: u8 = 40;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Platform {
    Kalshi,
    Polymarket,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kalshi => write!(f, "Kalshi"),
            Self::Polymarket => write!(f, "Polymarket"),
        }
    }
}

/// Keyword tier that produced a relevance score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(into = "u8", try_from = "u8")]
pub enum Tier {
    None,
    Direct,
    TradePolicy,
    MacroWeather,
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> u8 {
        match tier {
            Tier::None => 0,
            Tier::Direct => 1,
            Tier::TradePolicy => 2,
            Tier::MacroWeather => 3,
        }
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Direct),
            2 => Ok(Self::TradePolicy),
            3 => Ok(Self::MacroWeather),
            other => Err(format!("invalid tier {other}")),
        }
    }
}

/// Display category shown next to a market or headline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Weather,
    Commodities,
    Livestock,
    Energy,
    Inputs,
    Trade,
    Policy,
    Macro,
    Other,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Weather => "Weather",
            Self::Commodities => "Commodities",
            Self::Livestock => "Livestock",
            Self::Energy => "Energy",
            Self::Inputs => "Inputs",
            Self::Trade => "Trade",
            Self::Policy => "Policy",
            Self::Macro => "Macro",
            Self::Other => "Other",
        };
        f.write_str(label)
    }
}

/// Raw market fields normalized from one platform response, before scoring.
#[derive(Debug, Clone)]
pub struct MarketObservation {
    pub platform: Platform,
    pub ticker: String,
    pub title: String,
    pub yes: u8,
    pub no: u8,
    pub volume_24h: f64,
    pub close_time: String,
    pub url: String,
}

/// One prediction-market contract as published in `markets.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketRecord {
    pub platform: Platform,
    pub ticker: String,
    pub title: String,
    pub yes: u8,
    pub no: u8,
    pub volume_24h: f64,
    pub close_time: String,
    pub time_left: String,
    pub url: String,
    pub relevance: u8,
    pub tier: Tier,
    pub category: Category,
    pub why: String,
}

impl MarketRecord {
    /// Score, categorize and annotate an observation. The classifier sees the
    /// title followed by the ticker.
    pub fn from_observation(obs: MarketObservation, now: DateTime<Utc>) -> Self {
        let text = format!("{} {}", obs.title, obs.ticker);
        let relevance = score(&text);

        Self {
            time_left: time_remaining(&obs.close_time, now),
            category: categorize(&text),
            why: rationale(&text).to_string(),
            relevance: relevance.score,
            tier: relevance.tier,
            platform: obs.platform,
            ticker: obs.ticker,
            title: obs.title,
            yes: obs.yes,
            no: obs.no,
            volume_24h: obs.volume_24h,
            close_time: obs.close_time,
            url: obs.url,
        }
    }

    pub fn is_relevant(&self) -> bool {
        self.relevance >= MIN_RELEVANCE
    }
}

/// Counts of published markets per tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierBreakdown {
    pub tier1: usize,
    pub tier2: usize,
    pub tier3: usize,
}

/// Top-level document written to `markets.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketsReport {
    pub fetched: DateTime<Utc>,
    /// Relevant markets found across platforms before the output caps.
    pub total: usize,
    /// Markets published in `markets`.
    pub count: usize,
    pub by_platform: BTreeMap<String, usize>,
    pub tiers: TierBreakdown,
    /// Category label → tickers in ranked order.
    pub categories: BTreeMap<String, Vec<String>>,
    pub markets: Vec<MarketRecord>,
}

/// Human-readable time until close, e.g. "Closes in 12d".
pub fn time_remaining(close_time: &str, now: DateTime<Utc>) -> String {
    if close_time.is_empty() {
        return String::new();
    }
    let Some(close) = parse_close_time(close_time) else {
        return String::new();
    };

    let diff = close - now;
    if diff < chrono::Duration::zero() {
        return "Closed".to_string();
    }

    match diff.num_days() {
        0 => "Closes today".to_string(),
        1 => "Closes tomorrow".to_string(),
        days @ 2..=30 => format!("Closes in {days}d"),
        days => format!("Closes in ~{}mo", days / 30),
    }
}

/// RFC 3339 timestamps, or bare dates taken as midnight UTC.
fn parse_close_time(close_time: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(close_time) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(close_time, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_time_remaining_buckets() {
        assert_eq!(time_remaining("", now()), "");
        assert_eq!(time_remaining("not a date", now()), "");
        assert_eq!(time_remaining("2026-03-01T00:00:00Z", now()), "Closed");
        assert_eq!(time_remaining("2026-03-02T20:00:00Z", now()), "Closes today");
        assert_eq!(time_remaining("2026-03-03T18:00:00Z", now()), "Closes tomorrow");
        assert_eq!(time_remaining("2026-03-14T12:00:00Z", now()), "Closes in 12d");
        assert_eq!(time_remaining("2026-06-30T12:00:00+00:00", now()), "Closes in ~4mo");
        assert_eq!(time_remaining("2026-03-10", now()), "Closes in 7d");
    }

    #[test]
    fn test_tier_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Tier::TradePolicy).unwrap(), "2");
        let tier: Tier = serde_json::from_str("3").unwrap();
        assert_eq!(tier, Tier::MacroWeather);
        assert!(serde_json::from_str::<Tier>("7").is_err());
    }

    #[test]
    fn test_from_observation_annotates() {
        let obs = MarketObservation {
            platform: Platform::Kalshi,
            ticker: "KXCORN-26DEC".to_string(),
            title: "Will December corn settle above $5?".to_string(),
            yes: 41,
            no: 58,
            volume_24h: 1200.0,
            close_time: "2026-03-14T12:00:00Z".to_string(),
            url: "https://kalshi.com/markets/KXCORN-26DEC".to_string(),
        };
        let record = MarketRecord::from_observation(obs, now());
        assert_eq!(record.relevance, 100);
        assert_eq!(record.tier, Tier::Direct);
        assert_eq!(record.category, Category::Commodities);
        assert_eq!(record.time_left, "Closes in 12d");
        assert!(record.is_relevant());
    }
}
