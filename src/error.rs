//! Error types for the joke relay and the game event consumer
//!
//! Component errors are typed with thiserror; the application edge uses
//! anyhow for consistent error handling throughout startup and configuration.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Failures of a single joke relay call
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid joke count: {count} (must be at least 1)")]
    InvalidJokeCount { count: u32 },

    #[error("Upstream joke service unavailable: {message}")]
    UpstreamUnavailable { message: String },

    #[error("Upstream joke service returned a malformed response: {reason}")]
    UpstreamMalformedResponse { reason: String },

    #[error("Upstream joke service returned no jokes")]
    UpstreamEmptyResult,
}

impl RelayError {
    /// Short label used for metrics
    pub fn outcome(&self) -> &'static str {
        match self {
            RelayError::InvalidJokeCount { .. } => "invalid_count",
            RelayError::UpstreamUnavailable { .. } => "upstream_unavailable",
            RelayError::UpstreamMalformedResponse { .. } => "upstream_malformed",
            RelayError::UpstreamEmptyResult => "upstream_empty",
        }
    }

    /// False when the request was rejected before calling upstream
    pub fn reached_upstream(&self) -> bool {
        !matches!(self, RelayError::InvalidJokeCount { .. })
    }
}

/// Every relay failure is a bare 400; the cause is only visible in the logs.
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        StatusCode::BAD_REQUEST.into_response()
    }
}

/// Failures of the broker setup and of per-message handling
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("Broker setup failed: {message}")]
    BrokerSetupFailure { message: String },

    #[error("Failed to decode delivery {delivery_tag}: {reason}")]
    MessageDecodeFailure { delivery_tag: u64, reason: String },

    #[error("Message handler failed for delivery {delivery_tag}: {reason}")]
    HandlerFailed { delivery_tag: u64, reason: String },

    #[error("Failed to acknowledge delivery {delivery_tag}: {message}")]
    AcknowledgeFailed { delivery_tag: u64, message: String },
}

impl ConsumerError {
    pub(crate) fn setup(context: &str, err: impl std::fmt::Display) -> Self {
        ConsumerError::BrokerSetupFailure {
            message: format!("{}: {}", context, err),
        }
    }
}
