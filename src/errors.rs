// src/errors.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("price series is empty")]
    EmptySeries,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("price provider returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed price data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("price cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("device registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed device registry file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
