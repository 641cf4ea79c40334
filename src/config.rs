use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub output: OutputConfig,
    pub http: HttpConfig,
    pub markets: MarketsConfig,
    pub prices: PricesConfig,
    pub briefing: BriefingConfig,
    pub news: NewsConfig,
    pub weather: WeatherConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub data_dir: PathBuf,
    pub markets_file: String,
    pub prices_file: String,
    pub daily_file: String,
}

impl OutputConfig {
    pub fn markets_path(&self) -> PathBuf {
        self.data_dir.join(&self.markets_file)
    }

    pub fn prices_path(&self) -> PathBuf {
        self.data_dir.join(&self.prices_file)
    }

    pub fn daily_path(&self) -> PathBuf {
        self.data_dir.join(&self.daily_file)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub user_agent: String,
    pub markets_timeout_seconds: u64,
    pub prices_timeout_seconds: u64,
    pub news_timeout_seconds: u64,
    pub weather_timeout_seconds: u64,
    pub generation_timeout_seconds: u64,
}

impl HttpConfig {
    pub fn markets_timeout(&self) -> Duration {
        Duration::from_secs(self.markets_timeout_seconds)
    }

    pub fn prices_timeout(&self) -> Duration {
        Duration::from_secs(self.prices_timeout_seconds)
    }

    pub fn news_timeout(&self) -> Duration {
        Duration::from_secs(self.news_timeout_seconds)
    }

    pub fn weather_timeout(&self) -> Duration {
        Duration::from_secs(self.weather_timeout_seconds)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketsConfig {
    pub kalshi_base_url: String,
    pub gamma_base_url: String,
    pub clob_base_url: String,
    pub kalshi_queries: Vec<String>,
    pub polymarket_queries: Vec<String>,
    pub page_limit: u32,
    pub max_per_platform: usize,
    pub max_total: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricesConfig {
    pub yahoo_base_url: String,
    pub history_range: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteProviderKind {
    Barchart,
    Yahoo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BriefingConfig {
    pub anthropic_base_url: String,
    pub claude_model: String,
    pub max_tokens: u32,
    pub quote_provider: QuoteProviderKind,
    pub barchart_base_url: String,
    pub timezone: String,
    pub max_headlines: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsConfig {
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
    #[serde(default)]
    pub search_terms: Vec<String>,
    /// Google News RSS search endpoint used for `search_terms`.
    pub search_base_url: String,
    pub max_items_per_feed: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    pub nws_base_url: String,
    #[serde(default)]
    pub stations: Vec<StationConfig>,
    pub periods: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
}

/// Secrets loaded exclusively from environment variables.
/// Not serializable, not stored in config files.
pub struct Secrets {
    pub anthropic_api_key: Option<SecretString>,
    pub barchart_api_key: Option<SecretString>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: non_empty_env("ANTHROPIC_API_KEY"),
            barchart_api_key: non_empty_env("BARCHART_API_KEY"),
        }
    }
}

/// An exported-but-empty variable counts as unset.
fn non_empty_env(name: &str) -> Option<SecretString> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

impl AppConfig {
    /// Load configuration from a TOML file, overlaying environment variables for secrets.
    pub fn load(config_path: &Path) -> Result<(Self, Secrets)> {
        dotenvy::dotenv().ok();

        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        let secrets = Secrets::from_env();

        Ok((config, secrets))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_config() {
        let contents = std::fs::read_to_string("config/default.toml")
            .expect("config/default.toml should exist");
        let config = AppConfig::from_toml(&contents).expect("should parse");
        assert_eq!(config.markets.max_per_platform, 10);
        assert_eq!(config.markets.kalshi_queries.len(), 8);
        assert_eq!(config.briefing.quote_provider, QuoteProviderKind::Barchart);
        assert_eq!(config.briefing.max_tokens, 1200);
        assert_eq!(config.http.generation_timeout(), Duration::from_secs(60));
        assert!(!config.weather.stations.is_empty());
    }

    #[test]
    fn test_output_paths() {
        let output = OutputConfig {
            data_dir: PathBuf::from("out"),
            markets_file: "markets.json".to_string(),
            prices_file: "prices.json".to_string(),
            daily_file: "daily.json".to_string(),
        };
        assert_eq!(output.markets_path(), PathBuf::from("out/markets.json"));
        assert_eq!(output.daily_path(), PathBuf::from("out/daily.json"));
    }
}
