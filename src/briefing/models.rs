use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::news::Headline;

/// The `daily.json` document: model-written narrative plus run metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Briefing {
    #[serde(default)]
    pub date: String,
    pub headline: String,
    pub subheadline: String,
    pub lead: String,
    #[serde(default)]
    pub teaser: String,
    #[serde(default)]
    pub one_number: Option<OneNumber>,
    pub sections: Vec<Section>,
    #[serde(default)]
    pub watch_list: Vec<WatchItem>,

    #[serde(default)]
    pub prices_snapshot: BTreeMap<String, PriceSnapshot>,
    #[serde(default)]
    pub headlines: Vec<Headline>,
    #[serde(default)]
    pub weather: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OneNumber {
    pub value: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Section {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchItem {
    pub time: String,
    pub desc: String,
}

/// Display price and change for one contract, keyed by label in the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceSnapshot {
    pub price: String,
    pub change: String,
    pub pct: f64,
}
