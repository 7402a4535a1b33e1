//! Error types for the application.
//!
//! Only `ConfigError` is fatal, and only at startup. Everything else is
//! absorbed and logged by the sync tick or the message handler that hit it.

use thiserror::Error;

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Remote feed errors.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed could not be queried (unreachable, non-success status).
    #[error("Feed fetch failed: {message}")]
    Fetch { message: String },

    /// The feed did not answer within the per-destination budget.
    #[error("Feed fetch timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The feed rejected an outbound message.
    #[error("Feed submission failed: {message}")]
    Submission { message: String },

    /// The feed answered with something we could not decode.
    #[error("Unexpected feed response: {message}")]
    Decode { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors delivering a feed message to a destination channel.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Channel not available: {channel_id}")]
    ChannelUnavailable { channel_id: u64 },

    #[error("Failed to send message: {message}")]
    #[allow(dead_code)]
    SendFailed { message: String },

    #[error("Serenity error: {0}")]
    Serenity(#[from] serenity::Error),
}

/// Configuration store persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O failed for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Store file '{path}' is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for feed operations.
pub type FeedResult<T> = std::result::Result<T, FeedError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
