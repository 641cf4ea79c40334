//! Error taxonomy shared by the fetchers and the job drivers.
//!
//! `FetchError` covers the recoverable per-request failures; `RunError`
//! covers the conditions that end a job with a non-zero exit code.

use thiserror::Error;

/// A single upstream request that produced nothing usable.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed payload from {url}: {message}")]
    Parse { url: String, message: String },
}

impl FetchError {
    pub fn transport(url: &str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub fn parse(url: &str, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

/// Conditions that abort a job before its output file is touched.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("required credential {0} is not set")]
    MissingCredential(&'static str),

    #[error("no quotes fetched ({attempted} symbols attempted), refusing to overwrite prices")]
    NoQuotes { attempted: usize },

    #[error("generation request failed: {0}")]
    Generation(String),

    #[error("generation response is not valid briefing JSON: {0}")]
    UnparseableResponse(String),

    #[error("briefing is missing required keys: {}", .0.join(", "))]
    MissingRequiredKeys(Vec<String>),
}
