//! Relay failures and their HTTP translation.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::proxy::relay::RelayPhase;

/// Error type for a single relayed request.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The outbound request could not be built; nothing was sent.
    #[error("invalid upstream target: {0}")]
    InvalidTarget(String),

    /// Connection refused, reset, or connect timeout.
    #[error("failed to connect to upstream: {0}")]
    Connect(#[source] hyper_util::client::legacy::Error),

    /// The connection was up but the exchange failed.
    #[error("upstream exchange failed: {0}")]
    Exchange(#[source] hyper_util::client::legacy::Error),

    /// The upload stalled, or no response head arrived after it, for the
    /// configured window.
    #[error("upstream made no progress within {0:?}")]
    Timeout(Duration),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidTarget(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::Connect(_) | RelayError::Exchange(_) | RelayError::Timeout(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Phase the relay was in when it failed.
    pub fn phase(&self) -> RelayPhase {
        match self {
            RelayError::InvalidTarget(_) => RelayPhase::Idle,
            RelayError::Connect(_) => RelayPhase::Connecting,
            RelayError::Exchange(_) | RelayError::Timeout(_) => RelayPhase::ForwardingRequest,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = match self.status() {
            StatusCode::BAD_GATEWAY => "Upstream request failed",
            _ => "Internal Server Error",
        };
        (self.status(), body).into_response()
    }
}
