//! Thin GET helper shared by every upstream fetcher.
//!
//! Each fetcher owns one `HttpFetcher` built with its own timeout. Failures
//! come back as `FetchError` so callers can log and move on to the next query.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::ACCEPT;
use serde_json::Value;

use crate::error::FetchError;

pub const ACCEPT_JSON: &str = "application/json";
pub const ACCEPT_FEED: &str = "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.8";

#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }

    /// GET `url` with `query` parameters and parse the body as JSON.
    pub async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let body = self.get_body(url, query, ACCEPT_JSON).await?;
        serde_json::from_str(&body).map_err(|e| FetchError::parse(url, e))
    }

    /// GET `url` and return the raw body text (RSS/Atom feeds).
    pub async fn get_text(&self, url: &str, accept: &str) -> Result<String, FetchError> {
        self.get_body(url, &[], accept).await
    }

    async fn get_body(
        &self,
        url: &str,
        query: &[(&str, String)],
        accept: &str,
    ) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::transport(url, e))
    }
}

/// First present string among `keys`, skipping nulls and empty strings.
pub fn str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .filter_map(Value::as_str)
        .find(|s| !s.is_empty())
}

/// First present number among `keys`. Numeric strings are accepted since
/// several APIs quote numbers.
pub fn num_field(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().filter_map(|k| value.get(*k)).find_map(as_number)
}

pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new("test-agent/1.0", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_str_field_fallbacks() {
        let v = json!({"id": "", "condition_id": "0xabc", "title": null});
        assert_eq!(str_field(&v, &["id", "condition_id"]), Some("0xabc"));
        assert_eq!(str_field(&v, &["title", "question"]), None);
    }

    #[test]
    fn test_num_field_accepts_strings() {
        let v = json!({"volume": "1234.5", "volumeNum": 99});
        assert_eq!(num_field(&v, &["volume24hr", "volume"]), Some(1234.5));
        assert_eq!(num_field(&v, &["volumeNum"]), Some(99.0));
        assert_eq!(num_field(&v, &["missing"]), None);
    }

    #[tokio::test]
    async fn test_get_json_sends_headers_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/markets"))
            .and(query_param("keyword", "corn"))
            .and(header("accept", ACCEPT_JSON))
            .and(header("user-agent", "test-agent/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"markets": []})))
            .mount(&server)
            .await;

        let url = format!("{}/markets", server.uri());
        let body = fetcher()
            .get_json(&url, &[("keyword", "corn".to_string())])
            .await
            .unwrap();
        assert!(body["markets"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = fetcher().get_json(&server.uri(), &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = fetcher().get_json(&server.uri(), &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }
}
