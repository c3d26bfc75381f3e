//! Error types for the API client.
//!
//! Only 401 is ever intercepted (by the coordinator). Everything else is
//! surfaced to the caller through [`ApiError`] unchanged.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// The request never produced an HTTP response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request path could not be resolved against the base URL.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Why a token refresh cycle failed.
///
/// Every variant is terminal for the current credential session.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// No refresh token is stored.
    #[error("No refresh token available")]
    MissingRefreshToken,

    /// The refresh endpoint answered with a non-2xx status.
    #[error("Token refresh rejected (HTTP {status}): {message}")]
    Rejected {
        /// Status returned by the refresh endpoint.
        status: StatusCode,
        /// Envelope message, or the raw body when there is none.
        message: String,
    },

    /// The refresh call did not settle in time.
    #[error("Token refresh timed out after {0:?}")]
    Timeout(Duration),

    /// The refresh endpoint answered 2xx without a usable token.
    #[error("Malformed refresh response: {0}")]
    Malformed(String),

    /// The refresh call failed at the transport level.
    #[error("Token refresh transport error: {0}")]
    Transport(#[from] TransportError),

    /// The refresh cycle ended without settling this caller.
    #[error("Token refresh was abandoned")]
    Abandoned,

    /// The session was logged out or replaced while the refresh was in
    /// flight; its result was discarded.
    #[error("Session ended while the token was being refreshed")]
    SignedOut,
}

/// Errors returned by [`crate::ApiClient`] and the coordinator.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be delivered.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The access token expired and could not be refreshed.
    ///
    /// Shared by every caller that was waiting on the same refresh cycle.
    #[error("Session expired: {0}")]
    SessionExpired(Arc<RefreshError>),

    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// Response status.
        status: StatusCode,
        /// Envelope message, or the canonical reason when there is none.
        message: String,
    },

    /// A request or response body was not valid JSON for the expected type.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status carried by the error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the error ended the credential session.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }
}
