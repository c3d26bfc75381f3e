//! Token refresh endpoint.
//!
//! Exchanges the stored refresh token for a new access token:
//!
//! ```text
//! POST /auth/refresh-token
//! { "refreshToken": "<stored refresh token>" }
//!
//! 200 { "responseBody": { "data": { "token": "...", "refreshToken": "..." } } }
//! ```
//!
//! `refreshToken` in the answer is optional; when absent the stored one is
//! kept.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use threadline_core::{Envelope, UserId};
use tracing::instrument;

use crate::error::RefreshError;
use crate::transport::{ApiRequest, Transport};

/// Token payload returned by the login and refresh endpoints.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    /// User document, present on login.
    #[serde(default)]
    pub user: Option<serde_json::Value>,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

/// A freshly issued token pair.
#[derive(Clone)]
pub struct TokenPair {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
}

impl AuthTokens {
    /// Extract the token pair, rejecting an empty or missing access token.
    ///
    /// # Errors
    ///
    /// Returns `RefreshError::Malformed` when `token` is missing or blank.
    pub fn token_pair(&self) -> Result<TokenPair, RefreshError> {
        let access_token = self
            .token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| RefreshError::Malformed("missing data.token".to_string()))?;

        Ok(TokenPair {
            access_token: SecretString::from(access_token.to_string()),
            refresh_token: self
                .refresh_token
                .as_deref()
                .filter(|token| !token.trim().is_empty())
                .map(|token| SecretString::from(token.to_string())),
        })
    }

    /// The user ID, taken from `userId` or the user document's `_id`.
    #[must_use]
    pub fn resolved_user_id(&self) -> Option<UserId> {
        self.user_id.clone().or_else(|| {
            self.user
                .as_ref()
                .and_then(|user| user.get("_id"))
                .and_then(serde_json::Value::as_str)
                .map(UserId::new)
        })
    }
}

/// Exchange `refresh_token` for a new token pair.
///
/// The call goes straight to the transport, never through the coordinator,
/// so a 401 here cannot recurse into another refresh.
///
/// # Errors
///
/// Returns `RefreshError::Rejected` on any non-2xx status,
/// `RefreshError::Malformed` if the payload has no token, and
/// `RefreshError::Transport` on network failures.
#[instrument(skip(transport, refresh_token))]
pub async fn refresh_access_token(
    transport: &dyn Transport,
    refresh_path: &str,
    refresh_token: &SecretString,
) -> Result<TokenPair, RefreshError> {
    let request = ApiRequest::post(refresh_path)
        .with_json(&json!({ "refreshToken": refresh_token.expose_secret() }))
        .map_err(|e| RefreshError::Malformed(e.to_string()))?;

    let response = transport.execute(&request, None).await?;

    if !response.is_success() {
        return Err(RefreshError::Rejected {
            status: response.status,
            message: response.error_message(),
        });
    }

    let envelope: Envelope<AuthTokens> = response
        .json()
        .map_err(|e| RefreshError::Malformed(e.to_string()))?;

    envelope.into_data().token_pair()
}
