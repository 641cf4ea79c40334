//! Claude Messages API client for briefing generation.
//!
//! One POST per run, no retry. Every call's token usage and dollar cost
//! is logged.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::{BriefingConfig, HttpConfig};
use crate::error::RunError;

/// Claude API pricing (per token, as of 2025 for claude-sonnet-4-20250514).
const INPUT_PRICE_PER_MILLION: Decimal = dec!(3.00);
const OUTPUT_PRICE_PER_MILLION: Decimal = dec!(15.00);
const MILLION: Decimal = dec!(1_000_000);

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct ClaudeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
}

impl ClaudeClient {
    pub fn new(briefing: &BriefingConfig, http: &HttpConfig, api_key: SecretString) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&http.user_agent)
            .timeout(http.generation_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: briefing.anthropic_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: briefing.claude_model.clone(),
            max_tokens: briefing.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one message and return the concatenated text blocks.
    #[instrument(skip(self, system_prompt, user_prompt), fields(model = %self.model))]
    pub async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<ClaudeResponse, RunError> {
        let request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(system_prompt.to_string()),
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: user_prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RunError::Generation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let snippet: String = error_body.chars().take(500).collect();
            return Err(RunError::Generation(format!("Claude API error ({status}): {snippet}")));
        }

        let api_response: ClaudeApiResponse = response
            .json()
            .await
            .map_err(|e| RunError::Generation(format!("unreadable API response: {e}")))?;

        let text = api_response
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<&str>>()
            .join("");

        if text.trim().is_empty() {
            return Err(RunError::Generation("no text in Claude response".to_string()));
        }

        let input_tokens = api_response.usage.input_tokens;
        let output_tokens = api_response.usage.output_tokens;
        let cost = calculate_cost(input_tokens, output_tokens);

        info!(
            input_tokens,
            output_tokens,
            cost = %cost,
            "Claude API call completed"
        );

        Ok(ClaudeResponse { text })
    }
}

/// Calculate the dollar cost of a Claude API call.
pub fn calculate_cost(input_tokens: i64, output_tokens: i64) -> Decimal {
    let input_cost = Decimal::from(input_tokens) * INPUT_PRICE_PER_MILLION / MILLION;
    let output_cost = Decimal::from(output_tokens) * OUTPUT_PRICE_PER_MILLION / MILLION;
    input_cost + output_cost
}

// --- Request/Response Types ---

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeApiResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    input_tokens: i64,
    output_tokens: i64,
}

/// Text of a Claude API call. Usage and cost are logged, not returned.
#[derive(Debug)]
pub struct ClaudeResponse {
    pub text: String,
}
