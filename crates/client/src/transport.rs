//! HTTP transport seam.
//!
//! The coordinator talks to the network only through [`Transport`], which
//! keeps it independent of `reqwest` and lets tests script responses.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use threadline_core::ErrorEnvelope;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use crate::error::TransportError;

/// Request header carrying the per-call correlation ID.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// A request description that can be replayed.
///
/// The access token is not part of the request; it is supplied per
/// attempt so a replay can carry a fresh one.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `/products`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Correlation ID, kept identical across replays.
    pub request_id: Uuid,
}

impl ApiRequest {
    /// Create a request for `method` and `path`.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            request_id: Uuid::new_v4(),
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be represented as JSON.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ApiResponse {
    /// Build a response from a status and JSON value (handy for fakes).
    #[must_use]
    pub fn json_value(status: StatusCode, value: &serde_json::Value) -> Self {
        Self {
            status,
            body: Bytes::from(value.to_string()),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Best human-readable message for an error response.
    ///
    /// Prefers the envelope's `responseBody.message`, then a short raw
    /// body, then the status' canonical reason.
    #[must_use]
    pub fn error_message(&self) -> String {
        if let Ok(envelope) = self.json::<ErrorEnvelope>()
            && let Some(message) = envelope.message()
        {
            return message.to_string();
        }

        let raw = String::from_utf8_lossy(&self.body);
        let raw = raw.trim();
        if !raw.is_empty() && raw.len() <= 200 {
            return raw.to_string();
        }

        self.status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    }
}

/// Executes one HTTP attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request`, attaching `bearer` as the `Authorization` header.
    ///
    /// Any HTTP status is a successful execution; only failures to obtain
    /// a response are errors.
    async fn execute(
        &self,
        request: &ApiRequest,
        bearer: Option<&SecretString>,
    ) -> Result<ApiResponse, TransportError>;
}

/// [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Create a transport resolving paths against `base_url`.
    ///
    /// Ordinary calls carry no client-side timeout; only the connect phase
    /// is bounded.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: Url) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("threadline/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(client, base_url))
    }

    /// Create a transport around an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, mut base_url: Url) -> Self {
        // `Url::join` drops the last segment unless the base ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { client, base_url }
    }

    /// The normalised base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        let mut url = self.base_url.join(request.path.trim_start_matches('/'))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(
        skip(self, request, bearer),
        fields(method = %request.method, path = %request.path, request_id = %request.request_id)
    )]
    async fn execute(
        &self,
        request: &ApiRequest,
        bearer: Option<&SecretString>,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.resolve(request)?;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .header(REQUEST_ID_HEADER, request.request_id.to_string());

        if let Some(token) = bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        debug!(status = %status, bytes = body.len(), "response received");

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn transport(base: &str) -> ReqwestTransport {
        ReqwestTransport::with_client(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn test_resolve_keeps_base_path() {
        let transport = transport("http://api.test/v1");
        let url = transport.resolve(&ApiRequest::get("/products")).unwrap();
        assert_eq!(url.as_str(), "http://api.test/v1/products");
    }

    #[test]
    fn test_resolve_appends_query() {
        let transport = transport("http://api.test/");
        let request = ApiRequest::get("products").with_query("category", "shirts & tees");
        let url = transport.resolve(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "http://api.test/products?category=shirts+%26+tees"
        );
    }

    #[test]
    fn test_request_builders() {
        let request = ApiRequest::post("/cart")
            .with_json(&serde_json::json!({"quantity": 1}))
            .unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body.unwrap()["quantity"], 1);
    }

    #[test]
    fn test_error_message_prefers_envelope() {
        let response = ApiResponse::json_value(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({"statuscode": 400, "responseBody": {"message": "Out of stock"}}),
        );
        assert_eq!(response.error_message(), "Out of stock");
    }

    #[test]
    fn test_error_message_falls_back_to_reason() {
        let response = ApiResponse {
            status: StatusCode::BAD_GATEWAY,
            body: Bytes::new(),
        };
        assert_eq!(response.error_message(), "Bad Gateway");
    }

    #[test]
    fn test_error_message_uses_short_raw_body() {
        let response = ApiResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: Bytes::from_static(b"database down"),
        };
        assert_eq!(response.error_message(), "database down");
    }
}
