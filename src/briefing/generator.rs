//! Daily briefing generation.
//!
//! Builds the prompt from prices, weather and news, sends one request to
//! Claude and parses the reply strictly, with a single extraction attempt
//! when the reply is wrapped in prose or markdown.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::briefing::claude::ClaudeClient;
use crate::briefing::models::{Briefing, PriceSnapshot};
use crate::briefing::prompt;
use crate::data::news::Headline;
use crate::data::weather::StationForecast;
use crate::error::RunError;
use crate::prices::models::Quote;
use crate::prices::symbols::SymbolSpec;

const REQUIRED_KEYS: [&str; 4] = ["headline", "subheadline", "lead", "sections"];
const OPTIONAL_KEYS: [&str; 4] = ["date", "teaser", "one_number", "watch_list"];

/// Everything the prompt is built from.
pub struct BriefingInputs<'a> {
    pub symbols: &'a [SymbolSpec],
    pub quotes: &'a BTreeMap<String, Quote>,
    pub forecasts: &'a [StationForecast],
    pub headlines: &'a [Headline],
    pub sources: Vec<String>,
}

pub struct BriefingGenerator {
    claude: ClaudeClient,
    timezone: Tz,
}

impl BriefingGenerator {
    pub fn new(claude: ClaudeClient, timezone: &str) -> Result<Self> {
        let timezone: Tz = timezone
            .parse()
            .map_err(|e| anyhow!("unknown timezone {timezone}: {e}"))?;
        Ok(Self { claude, timezone })
    }

    /// Local calendar date used in the prompt and as the document date.
    pub fn local_date(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.timezone)
            .format("%A, %B %-d, %Y")
            .to_string()
    }

    #[instrument(skip(self, inputs), fields(quotes = inputs.quotes.len(), headlines = inputs.headlines.len()))]
    pub async fn generate(&self, inputs: BriefingInputs<'_>, now: DateTime<Utc>) -> Result<Briefing, RunError> {
        let date = self.local_date(now);
        let user_prompt = prompt::user_prompt(
            &date,
            &prompt::market_summary(inputs.symbols, inputs.quotes),
            &prompt::weather_summary(inputs.forecasts),
            &prompt::news_summary(inputs.headlines),
        );

        let response = self.claude.complete(&prompt::system_prompt(), &user_prompt).await?;
        let mut briefing = parse_briefing(&response.text)?;

        if briefing.date.trim().is_empty() {
            briefing.date = date;
        }
        briefing.prices_snapshot = price_snapshot(inputs.symbols, inputs.quotes);
        briefing.headlines = inputs.headlines.to_vec();
        briefing.weather = inputs.forecasts.iter().map(StationForecast::summary_line).collect();
        briefing.sources = inputs.sources;
        briefing.generated_at = now;
        briefing.model = self.claude.model().to_string();

        info!(
            headline = %briefing.headline,
            sections = briefing.sections.len(),
            "Briefing generated"
        );
        Ok(briefing)
    }
}

/// Label → display price for every contract that has a quote.
pub fn price_snapshot(symbols: &[SymbolSpec], quotes: &BTreeMap<String, Quote>) -> BTreeMap<String, PriceSnapshot> {
    symbols
        .iter()
        .filter_map(|spec| {
            let q = quotes.get(spec.key)?;
            Some((
                spec.label.to_string(),
                PriceSnapshot {
                    price: prompt::format_price(spec, q.close),
                    change: prompt::format_change(q.net_change, q.pct_change, spec.is_bushel_grain()),
                    pct: q.pct_change,
                },
            ))
        })
        .collect()
}

/// Parse the model's reply into a briefing.
///
/// Strict JSON first; if that fails, one recovery pass that strips a
/// markdown fence and takes the first balanced object. Missing or null
/// optional keys are logged and left at their defaults.
pub fn parse_briefing(text: &str) -> Result<Briefing, RunError> {
    let value = match serde_json::from_str::<Value>(text.trim()) {
        Ok(value) => value,
        Err(strict_err) => {
            warn!(error = %strict_err, "Briefing reply is not strict JSON, attempting recovery");
            recover_object(text).ok_or_else(|| RunError::UnparseableResponse(snippet(text)))?
        }
    };

    let Value::Object(mut fields) = value else {
        return Err(RunError::UnparseableResponse(snippet(text)));
    };

    let missing: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|key| fields.get(**key).map_or(true, Value::is_null))
        .map(|key| key.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(RunError::MissingRequiredKeys(missing));
    }

    for key in OPTIONAL_KEYS {
        if fields.get(key).map_or(true, Value::is_null) {
            warn!(key, "Briefing reply is missing optional key");
            fields.remove(key);
        }
    }

    serde_json::from_value(Value::Object(fields)).map_err(|e| RunError::UnparseableResponse(e.to_string()))
}

fn snippet(text: &str) -> String {
    text.chars().take(200).collect()
}

/// The reply with fences removed, parsed whole or else from its first object.
fn recover_object(text: &str) -> Option<Value> {
    let body = strip_fences(text);
    serde_json::from_str(body)
        .ok()
        .or_else(|| first_object(body).and_then(|obj| serde_json::from_str(obj).ok()))
}

/// Drop a leading "```lang" line and everything from the last "```".
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.rsplit_once("```").map_or(body, |(inner, _)| inner).trim()
}

/// First balanced `{...}` in `text`. Braces inside string literals don't count.
fn first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut i = start;

    while i < bytes.len() {
        match (in_string, bytes[i]) {
            (true, b'\\') => i += 1,
            (_, b'"') => in_string = !in_string,
            (false, b'{') => depth += 1,
            (false, b'}') => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::symbols::by_key;
    use chrono::TimeZone;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REPLY: &str = r#"{
        "headline": "CORN FIRMS ON EXPORT DEMAND",
        "subheadline": "Strong Sales Lift Nearby Futures",
        "lead": "Corn gained overnight. Beans followed.",
        "teaser": "Exports carry the grain complex.",
        "one_number": {"value": "$4.82¼", "unit": "front-month corn", "context": "Highest in two weeks."},
        "sections": [{"title": "Grain Markets", "body": "Corn up."}],
        "watch_list": [{"time": "7:30am CT", "desc": "Export Sales"}]
    }"#;

    #[test]
    fn test_parse_strict_json() {
        let briefing = parse_briefing(REPLY).unwrap();
        assert_eq!(briefing.headline, "CORN FIRMS ON EXPORT DEMAND");
        assert_eq!(briefing.sections.len(), 1);
        assert_eq!(briefing.one_number.unwrap().value, "$4.82¼");
        assert!(briefing.date.is_empty());
    }

    #[test]
    fn test_parse_recovers_fenced_json() {
        let text = format!("Here is today's briefing:\n```json\n{REPLY}\n```\nLet me know.");
        let briefing = parse_briefing(&text).unwrap();
        assert_eq!(briefing.watch_list[0].desc, "Export Sales");
    }

    #[test]
    fn test_parse_recovers_object_in_prose() {
        let text = r#"Sure! {"headline": "A {B}", "subheadline": "S", "lead": "L", "sections": []} Done."#;
        let briefing = parse_briefing(text).unwrap();
        assert_eq!(briefing.headline, "A {B}");
    }

    #[test]
    fn test_optional_keys_may_be_missing() {
        let text = r#"{"headline": "H", "subheadline": "S", "lead": "L", "sections": []}"#;
        let briefing = parse_briefing(text).unwrap();
        assert!(briefing.one_number.is_none());
        assert!(briefing.watch_list.is_empty());
    }

    #[test]
    fn test_missing_required_keys() {
        let text = r#"{"headline": "H", "lead": null}"#;
        match parse_briefing(text).unwrap_err() {
            RunError::MissingRequiredKeys(keys) => {
                assert_eq!(keys, vec!["subheadline", "lead", "sections"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unparseable_reply() {
        assert!(matches!(
            parse_briefing("I cannot help with that."),
            Err(RunError::UnparseableResponse(_))
        ));
        assert!(matches!(parse_briefing("[1, 2]"), Err(RunError::UnparseableResponse(_))));
        // Required keys present but wrong shape.
        assert!(matches!(
            parse_briefing(r#"{"headline": "H", "subheadline": "S", "lead": "L", "sections": "none"}"#),
            Err(RunError::UnparseableResponse(_))
        ));
    }

    #[test]
    fn test_first_object_ignores_braces_in_strings() {
        let text = r#"x {"a": "}{\"", "b": {"c": 1}} y {"d": 2}"#;
        assert_eq!(first_object(text).unwrap(), r#"{"a": "}{\"", "b": {"c": 1}}"#);
        assert!(first_object("no json here").is_none());
        assert!(first_object("{\"open\": true").is_none());
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_fences("```\n{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn test_null_optional_keys_take_defaults() {
        let text = r#"{"headline": "H", "subheadline": "S", "lead": "L", "sections": [],
            "date": null, "teaser": null, "one_number": null, "watch_list": null}"#;
        let briefing = parse_briefing(text).unwrap();
        assert!(briefing.date.is_empty());
        assert!(briefing.teaser.is_empty());
        assert!(briefing.one_number.is_none());
        assert!(briefing.watch_list.is_empty());
    }

    #[tokio::test]
    async fn test_generate_fills_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": REPLY}],
                "usage": {"input_tokens": 900, "output_tokens": 300}
            })))
            .mount(&server)
            .await;

        let mut config = crate::config::AppConfig::from_toml(include_str!("../../config/default.toml")).unwrap();
        config.briefing.anthropic_base_url = server.uri();
        let claude = ClaudeClient::new(&config.briefing, &config.http, SecretString::from("sk-test")).unwrap();
        let generator = BriefingGenerator::new(claude, &config.briefing.timezone).unwrap();

        let corn = *by_key("corn").unwrap();
        // 03:00 UTC on March 3 is still March 2 in Chicago.
        let now = Utc.with_ymd_and_hms(2026, 3, 3, 3, 0, 0).unwrap();
        let mut quotes = BTreeMap::new();
        quotes.insert("corn".to_string(), Quote::from_closes(&corn, 482.25, 479.0, 478.75, now));
        let symbols = [corn];

        let briefing = generator
            .generate(
                BriefingInputs {
                    symbols: &symbols,
                    quotes: &quotes,
                    forecasts: &[],
                    headlines: &[],
                    sources: vec!["Barchart".to_string()],
                },
                now,
            )
            .await
            .unwrap();

        assert_eq!(briefing.date, "Monday, March 2, 2026");
        assert_eq!(briefing.model, "claude-sonnet-4-20250514");
        assert_eq!(briefing.generated_at, now);
        assert_eq!(briefing.prices_snapshot["Corn (front)"].price, "$4.82¼");
        assert_eq!(briefing.prices_snapshot["Corn (front)"].change, "up 3.5¢ (0.73%)");
        assert_eq!(briefing.sources, vec!["Barchart"]);
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let config = crate::config::AppConfig::from_toml(include_str!("../../config/default.toml")).unwrap();
        let claude = ClaudeClient::new(&config.briefing, &config.http, SecretString::from("sk-test")).unwrap();
        assert!(BriefingGenerator::new(claude, "Mars/Olympus").is_err());
    }
}
