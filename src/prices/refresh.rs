//! Quote refresh with carry-forward of the previous run's values.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::RunError;
use crate::prices::models::PricesReport;
use crate::prices::symbols::SymbolSpec;
use crate::prices::QuoteProvider;

/// Fetch `symbols` and merge with `previous`. A symbol that failed keeps
/// its prior quote unchanged and is listed in `stale`; with no prior quote
/// it is left out. Zero successful fetches is an error so a fully stale
/// snapshot is never published.
pub async fn refresh_quotes(
    provider: &dyn QuoteProvider,
    symbols: &[SymbolSpec],
    previous: Option<&PricesReport>,
    now: DateTime<Utc>,
) -> Result<PricesReport, RunError> {
    let batch = provider.fetch_quotes(symbols, now).await;

    if batch.quotes.is_empty() {
        return Err(RunError::NoQuotes {
            attempted: symbols.len(),
        });
    }

    let succeeded = batch.quotes.len();
    let mut quotes = batch.quotes;
    let mut stale = Vec::new();

    for key in &batch.failed {
        match previous.and_then(|p| p.quotes.get(key)) {
            Some(prior) => {
                warn!(key = %key, last_time = %prior.time, "Carrying forward previous quote");
                quotes.insert(key.clone(), prior.clone());
                stale.push(key.clone());
            }
            None => warn!(key = %key, "No previous quote to carry forward, omitting"),
        }
    }

    info!(
        succeeded,
        failed = batch.failed.len(),
        stale = stale.len(),
        total = symbols.len(),
        "Quote refresh complete"
    );

    Ok(PricesReport {
        fetched: now,
        source: provider.source().to_string(),
        succeeded,
        failed: batch.failed.len(),
        stale,
        quotes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::models::Quote;
    use crate::prices::symbols::{by_key, SYMBOLS};
    use crate::prices::QuoteBatch;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    /// Returns a fixed close for the listed keys and fails the rest.
    struct StubProvider {
        live: Vec<(&'static str, f64, f64)>,
    }

    #[async_trait]
    impl QuoteProvider for StubProvider {
        fn source(&self) -> &'static str {
            "stub"
        }

        async fn fetch_quotes(&self, symbols: &[SymbolSpec], now: DateTime<Utc>) -> QuoteBatch {
            let mut batch = QuoteBatch::default();
            for spec in symbols {
                match self.live.iter().find(|(k, _, _)| *k == spec.key) {
                    Some((_, close, prev)) => {
                        batch
                            .quotes
                            .insert(spec.key.to_string(), Quote::from_closes(spec, *close, *close, *prev, now));
                    }
                    None => batch.failed.push(spec.key.to_string()),
                }
            }
            batch
        }
    }

    fn yesterday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 21, 0, 0).unwrap()
    }

    fn previous_report() -> PricesReport {
        let mut quotes = BTreeMap::new();
        quotes.insert(
            "beans".to_string(),
            Quote::from_closes(by_key("beans").unwrap(), 1050.0, 1046.0, 1044.0, yesterday()),
        );
        PricesReport {
            fetched: yesterday(),
            source: "stub".into(),
            succeeded: 1,
            failed: 0,
            stale: vec![],
            quotes,
        }
    }

    #[tokio::test]
    async fn test_fresh_quote_replaces_and_failures_carry_forward() {
        let provider = StubProvider {
            live: vec![("corn", 4.82, 4.70)],
        };
        let symbols = [*by_key("corn").unwrap(), *by_key("beans").unwrap(), *by_key("wheat").unwrap()];
        let prior = previous_report();

        let report = refresh_quotes(&provider, &symbols, Some(&prior), Utc::now())
            .await
            .unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.stale, vec!["beans".to_string()]);
        assert_eq!(report.quotes["corn"].net_change, 0.12);
        assert_eq!(report.quotes["beans"], prior.quotes["beans"]);
        assert!(!report.quotes.contains_key("wheat"));
    }

    #[tokio::test]
    async fn test_all_symbols_failing_is_error() {
        let provider = StubProvider { live: vec![] };
        let prior = previous_report();

        let err = refresh_quotes(&provider, &SYMBOLS, Some(&prior), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::NoQuotes { attempted: 19 }));
    }
}
