//! Error types for the response gateway

use thiserror::Error;

use crate::providers::Provider;

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can reach the caller of [`crate::ChatGateway::submit`].
///
/// Single-candidate failures (`ProviderTransport`, `MalformedResponse`) are recovered
/// inside the fallback loop and only surface wrapped in `ProviderExhausted`.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider transport error: {0}")]
    ProviderTransport(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("All {attempts} candidate(s) for {provider} failed; last error: {last_error}")]
    ProviderExhausted {
        provider: Provider,
        attempts: usize,
        last_error: String,
    },
}

impl GatewayError {
    /// True for failures caused by the request itself rather than the gateway or upstream.
    pub fn is_client_error(&self) -> bool {
        matches!(self, GatewayError::InvalidRequest(_))
    }
}

/// Errors raised while loading [`crate::GatewayConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config source error: {0}")]
    Source(#[from] config::ConfigError),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Errors from a [`crate::HistoryStore`]. Never propagated to chat callers.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("History backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
