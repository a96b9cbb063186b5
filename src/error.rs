// src/error.rs
use thiserror::Error;

use crate::services::number::ParseNumberError;

pub type Result<T> = std::result::Result<T, ScreenerError>;

#[derive(Debug, Error)]
pub enum ScreenerError {
    #[error("market {market}: missing required key `{key}`")]
    MissingConfigKey { market: usize, key: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("request to {url} failed with status {status}")]
    FailedRequest { url: String, status: u16 },

    #[error("empty response from {url}")]
    EmptyResponse { url: String },

    #[error(transparent)]
    Parse(#[from] ParseNumberError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("sector not found on profile page")]
    SectorNotFound,

    #[error("share count not found on statistics page")]
    ShareCountNotFound,

    #[error("share count parsed as zero")]
    InvalidShareCount,

    #[error("cache key not found: {0}")]
    KeyNotFound(String),

    #[error("cache entry expired: {0}")]
    Expired(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid selector `{0}`")]
    Selector(String),
}
