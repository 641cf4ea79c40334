use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::prices::symbols::{AssetType, SymbolSpec};

/// One price snapshot as published in `prices.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub sym: String,
    pub label: String,
    pub unit: String,
    #[serde(rename = "type")]
    pub asset: AssetType,
    pub close: f64,
    pub open: f64,
    pub prev_close: f64,
    pub net_change: f64,
    pub pct_change: f64,
    pub time: DateTime<Utc>,
}

impl Quote {
    /// Build a quote from raw prices. Change fields are always derived from
    /// `close` and `prev_close`, never taken from the upstream.
    pub fn from_closes(
        spec: &SymbolSpec,
        close: f64,
        open: f64,
        prev_close: f64,
        time: DateTime<Utc>,
    ) -> Self {
        let net_change = round4(close - prev_close);
        let pct_change = if prev_close != 0.0 {
            round4(net_change / prev_close * 100.0)
        } else {
            0.0
        };

        Self {
            sym: spec.symbol.to_string(),
            label: spec.label.to_string(),
            unit: spec.unit.to_string(),
            asset: spec.asset,
            close: round4(close),
            open: round4(open),
            prev_close: round4(prev_close),
            net_change,
            pct_change,
            time,
        }
    }
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Top-level document written to `prices.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricesReport {
    pub fetched: DateTime<Utc>,
    pub source: String,
    #[serde(default)]
    pub succeeded: usize,
    #[serde(default)]
    pub failed: usize,
    /// Keys whose quote was carried forward from the previous run.
    #[serde(default)]
    pub stale: Vec<String>,
    pub quotes: BTreeMap<String, Quote>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::symbols::by_key;

    #[test]
    fn test_change_from_closes() {
        let q = Quote::from_closes(by_key("corn").unwrap(), 4.82, 4.75, 4.70, Utc::now());
        assert_eq!(q.net_change, 0.12);
        assert!((q.pct_change - 2.553).abs() < 0.001);
        assert_eq!(q.sym, "ZC=F");
    }

    #[test]
    fn test_zero_prev_close() {
        let q = Quote::from_closes(by_key("treasury10").unwrap(), 4.1, 4.0, 0.0, Utc::now());
        assert_eq!(q.pct_change, 0.0);
        assert_eq!(q.net_change, 4.1);
    }

    #[test]
    fn test_wire_field_names() {
        let q = Quote::from_closes(by_key("cattle").unwrap(), 200.0, 199.0, 198.0, Utc::now());
        let v = serde_json::to_value(&q).unwrap();
        for key in ["sym", "label", "unit", "type", "close", "open", "prevClose", "netChange", "pctChange", "time"] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert_eq!(v["type"], "livestock");
    }

    #[test]
    fn test_report_reads_legacy_shape() {
        let legacy = r#"{"fetched": "2026-03-02T12:00:00Z", "source": "Yahoo Finance", "quotes": {}}"#;
        let report: PricesReport = serde_json::from_str(legacy).unwrap();
        assert_eq!(report.failed, 0);
        assert!(report.stale.is_empty());
    }
}
