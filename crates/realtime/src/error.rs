use thiserror::Error;

/// Errors raised by realtime store clients and subscriptions.
#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Request failed with status {status}: {message}")]
    RequestFailed {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Store error: {0}")]
    StoreError(String),
}

impl RealtimeError {
    pub fn invalid_path<T: std::fmt::Display>(message: T) -> Self {
        Self::InvalidPath(message.to_string())
    }

    pub fn store<T: std::fmt::Display>(message: T) -> Self {
        Self::StoreError(message.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RealtimeError>;
