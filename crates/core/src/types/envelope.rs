//! The backend's uniform response wrapper.
//!
//! Every endpoint answers with:
//!
//! ```json
//! { "statuscode": 200, "responseBody": { "data": ..., "message": "..." } }
//! ```

use serde::{Deserialize, Serialize};

/// Envelope wrapping every backend response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Status code echoed by the backend (mirrors the HTTP status).
    #[serde(default)]
    pub statuscode: u16,
    /// Payload and optional human-readable message.
    #[serde(rename = "responseBody")]
    pub response_body: ResponseBody<T>,
}

/// The `responseBody` part of an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBody<T> {
    /// Endpoint-specific payload.
    pub data: T,
    /// Optional message, usually present on errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Wrap a payload in a success envelope.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            statuscode: 200,
            response_body: ResponseBody {
                data,
                message: None,
            },
        }
    }

    /// Unwrap into the payload.
    #[must_use]
    pub fn into_data(self) -> T {
        self.response_body.data
    }
}

/// Error-side view of an envelope: only the message matters.
///
/// Error responses often carry `data: null` or omit `data`, so this type
/// deserializes any envelope without caring about the payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorEnvelope {
    /// Status code echoed by the backend.
    #[serde(default)]
    pub statuscode: u16,
    #[serde(rename = "responseBody", default)]
    response_body: Option<ErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl ErrorEnvelope {
    /// The backend-provided message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.response_body
            .as_ref()
            .and_then(|body| body.message.as_deref())
    }
}
