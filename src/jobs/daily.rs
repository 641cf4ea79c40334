use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tracing::{info, warn};

use crate::briefing::claude::ClaudeClient;
use crate::briefing::{Briefing, BriefingGenerator, BriefingInputs};
use crate::config::{AppConfig, QuoteProviderKind, Secrets};
use crate::data::news::{news_sources, Headline};
use crate::data::weather::WeatherSource;
use crate::data::{DataAggregator, DataSource};
use crate::error::RunError;
use crate::output::{read_json, write_json_atomic};
use crate::prices::barchart::BarchartClient;
use crate::prices::models::{PricesReport, Quote};
use crate::prices::refresh::refresh_quotes;
use crate::prices::symbols::{briefing_symbols, SymbolSpec};
use crate::prices::yahoo::YahooClient;
use crate::prices::QuoteProvider;

const WEATHER_ATTRIBUTION: &str = "National Weather Service";

/// Generate and publish `daily.json`.
///
/// Credentials are checked before any request goes out. Individual quotes
/// that fail fall back to the last published `prices.json`, but a run with
/// no live quotes publishes nothing. News that fails entirely falls back to
/// the previous briefing's headlines.
pub async fn run(config: &AppConfig, secrets: &Secrets, now: DateTime<Utc>) -> Result<Briefing> {
    let anthropic_key = require(&secrets.anthropic_api_key, "ANTHROPIC_API_KEY")?;
    let provider = quote_provider(config, secrets)?;

    let claude = ClaudeClient::new(&config.briefing, &config.http, anthropic_key)?;
    let generator = BriefingGenerator::new(claude, &config.briefing.timezone)?;

    let daily_path = config.output.daily_path();
    let previous: Option<Briefing> = read_json(&daily_path).await;

    let symbols = briefing_symbols();
    let quotes = gather_quotes(config, provider.as_ref(), &symbols, now).await?;

    let mut sources: Vec<Box<dyn DataSource>> = news_sources(&config.news, &config.http)?
        .into_iter()
        .map(|s| Box::new(s) as Box<dyn DataSource>)
        .collect();
    sources.push(Box::new(WeatherSource::new(&config.weather, &config.http)?));
    let gathered = DataAggregator::new(sources).fetch_all().await;

    let mut headlines = gathered.headlines;
    headlines.truncate(config.briefing.max_headlines);
    if headlines.is_empty() {
        headlines = previous.map(|b| b.headlines).unwrap_or_default();
        warn!(reused = headlines.len(), "No fresh headlines, reusing previous briefing's");
    }

    let attribution = attribution(provider.source(), !gathered.forecasts.is_empty(), &headlines);

    let briefing = generator
        .generate(
            BriefingInputs {
                symbols: &symbols,
                quotes: &quotes,
                forecasts: &gathered.forecasts,
                headlines: &headlines,
                sources: attribution,
            },
            now,
        )
        .await?;

    write_json_atomic(&daily_path, &briefing).await?;
    info!(path = %daily_path.display(), headline = %briefing.headline, "Daily briefing published");
    Ok(briefing)
}

fn require(secret: &Option<SecretString>, name: &'static str) -> Result<SecretString, RunError> {
    secret.clone().ok_or(RunError::MissingCredential(name))
}

fn quote_provider(config: &AppConfig, secrets: &Secrets) -> Result<Box<dyn QuoteProvider>> {
    Ok(match config.briefing.quote_provider {
        QuoteProviderKind::Barchart => {
            let key = require(&secrets.barchart_api_key, "BARCHART_API_KEY")?;
            Box::new(BarchartClient::new(&config.briefing, &config.http, key)?)
        }
        QuoteProviderKind::Yahoo => Box::new(YahooClient::new(&config.prices, &config.http)?),
    })
}

/// Live quotes for the briefing contracts, with `prices.json` filling in
/// failed symbols. No live quote at all is fatal.
async fn gather_quotes(
    config: &AppConfig,
    provider: &dyn QuoteProvider,
    symbols: &[SymbolSpec],
    now: DateTime<Utc>,
) -> Result<BTreeMap<String, Quote>, RunError> {
    let published: Option<PricesReport> = read_json(&config.output.prices_path()).await;
    let report = refresh_quotes(provider, symbols, published.as_ref(), now).await?;
    Ok(report.quotes)
}

/// Quote provider, weather service when used, then each distinct news
/// source in order of first appearance.
fn attribution(quote_source: &str, has_weather: bool, headlines: &[Headline]) -> Vec<String> {
    let mut sources = vec![quote_source.to_string()];
    if has_weather {
        sources.push(WEATHER_ATTRIBUTION.to_string());
    }
    for h in headlines {
        if !sources.contains(&h.source) {
            sources.push(h.source.clone());
        }
    }
    sources
}
