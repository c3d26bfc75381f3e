//! Typed envelope-aware API client.

use std::borrow::Cow;
use std::sync::Arc;

use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use threadline_core::{Envelope, ResponseBody};
use tracing::instrument;

use crate::config::ClientConfig;
use crate::coordinator::AuthCoordinator;
use crate::error::{ApiError, TransportError};
use crate::events::SessionEvents;
use crate::storage::CredentialStore;
use crate::transport::{ApiRequest, ApiResponse, ReqwestTransport};

/// Percent-encode a value for use as a single path segment.
#[must_use]
pub fn segment(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

/// Client for the storefront backend.
///
/// Cheap to clone; all clones share one [`AuthCoordinator`].
#[derive(Clone)]
pub struct ApiClient {
    coordinator: AuthCoordinator,
}

impl ApiClient {
    #[must_use]
    pub const fn new(coordinator: AuthCoordinator) -> Self {
        Self { coordinator }
    }

    /// Build a client talking to `config.base_url` over `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(
        config: &ClientConfig,
        store: Arc<dyn CredentialStore>,
        events: SessionEvents,
    ) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.base_url.clone())?;
        Ok(Self::new(AuthCoordinator::new(
            Arc::new(transport),
            store,
            events,
            config.refresh.clone(),
        )))
    }

    #[must_use]
    pub const fn coordinator(&self) -> &AuthCoordinator {
        &self.coordinator
    }

    /// The credential store behind this client.
    #[must_use]
    pub fn store(&self) -> &dyn CredentialStore {
        self.coordinator.store()
    }

    #[must_use]
    pub fn events(&self) -> &SessionEvents {
        self.coordinator.events()
    }

    /// Send an authenticated request and decode the envelope.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` for non-2xx answers, `ApiError::Json` if
    /// the envelope does not match `T`, and whatever the coordinator raises.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<ResponseBody<T>, ApiError> {
        let response = self.coordinator.send(&request).await?;
        decode(&response)
    }

    /// Send a request without credentials and without refresh handling.
    ///
    /// # Errors
    ///
    /// Same as [`Self::execute`], minus session expiry.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn execute_anonymous<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<ResponseBody<T>, ApiError> {
        let response = self.coordinator.send_anonymous(&request).await?;
        decode(&response)
    }

    /// Send a request whose payload is irrelevant; returns the message.
    ///
    /// # Errors
    ///
    /// Same as [`Self::execute`].
    pub async fn execute_empty(&self, request: ApiRequest) -> Result<Option<String>, ApiError> {
        let body: ResponseBody<Option<IgnoredAny>> = self.execute(request).await?;
        Ok(body.message)
    }

    /// `GET path`, returning `data`.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        Ok(self.execute(ApiRequest::get(path)).await?.data)
    }

    /// `POST path` with a JSON body, returning `data`.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        Ok(self
            .execute(ApiRequest::post(path).with_json(body)?)
            .await?
            .data)
    }

    /// `PUT path` with a JSON body, returning `data`.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        Ok(self
            .execute(ApiRequest::put(path).with_json(body)?)
            .await?
            .data)
    }

    /// `PATCH path` with a JSON body, returning `data`.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        Ok(self
            .execute(ApiRequest::patch(path).with_json(body)?)
            .await?
            .data)
    }

    /// `DELETE path`, returning the envelope message.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn delete(&self, path: &str) -> Result<Option<String>, ApiError> {
        self.execute_empty(ApiRequest::delete(path)).await
    }
}

fn decode<T: DeserializeOwned>(response: &ApiResponse) -> Result<ResponseBody<T>, ApiError> {
    if !response.is_success() {
        return Err(ApiError::Status {
            status: response.status,
            message: response.error_message(),
        });
    }
    let envelope: Envelope<T> = response.json()?;
    Ok(envelope.response_body)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use secrecy::{ExposeSecret, SecretString};
    use serde_json::json;

    use super::*;
    use crate::config::RefreshPolicy;
    use crate::storage::{Credentials, MemoryCredentialStore};
    use crate::transport::Transport;

    /// Echoes method, path, body and bearer back inside an envelope.
    struct Echo;

    #[async_trait]
    impl Transport for Echo {
        async fn execute(
            &self,
            request: &ApiRequest,
            bearer: Option<&SecretString>,
        ) -> Result<ApiResponse, TransportError> {
            if request.path == "/missing" {
                return Ok(ApiResponse::json_value(
                    StatusCode::NOT_FOUND,
                    &json!({"statuscode": 404, "responseBody": {"message": "Product not found"}}),
                ));
            }
            if request.path == "/login" {
                return Ok(ApiResponse::json_value(
                    StatusCode::UNAUTHORIZED,
                    &json!({"statuscode": 401, "responseBody": {"message": "Invalid credentials"}}),
                ));
            }
            Ok(ApiResponse::json_value(
                StatusCode::OK,
                &json!({
                    "statuscode": 200,
                    "responseBody": {
                        "data": {
                            "method": request.method.as_str(),
                            "path": request.path,
                            "body": request.body,
                            "bearer": bearer.map(|b| b.expose_secret().to_string()),
                        },
                        "message": "ok"
                    }
                }),
            ))
        }
    }

    fn client() -> ApiClient {
        let store = MemoryCredentialStore::with_credentials(Credentials::new(
            SecretString::from("t1"),
            None,
        ));
        ApiClient::new(AuthCoordinator::new(
            Arc::new(Echo),
            Arc::new(store),
            SessionEvents::default(),
            RefreshPolicy::default(),
        ))
    }

    #[tokio::test]
    async fn test_get_attaches_bearer_and_unwraps_data() {
        let data: serde_json::Value = client().get("/users/profile").await.unwrap();
        assert_eq!(data["method"], "GET");
        assert_eq!(data["path"], "/users/profile");
        assert_eq!(data["bearer"], "t1");
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let data: serde_json::Value = client()
            .post("/cart", &json!({"productId": "p1", "quantity": 2}))
            .await
            .unwrap();
        assert_eq!(data["body"]["quantity"], 2);
    }

    #[tokio::test]
    async fn test_non_success_maps_to_status_error() {
        let err = client()
            .get::<serde_json::Value>("/missing")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert!(err.to_string().contains("Product not found"));
    }

    #[tokio::test]
    async fn test_anonymous_401_is_not_a_session_expiry() {
        let err = client()
            .execute_anonymous::<serde_json::Value>(ApiRequest::post("/login"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert!(!err.is_session_expired());
    }

    #[tokio::test]
    async fn test_delete_returns_message() {
        let message = client().delete("/wishlist/p1").await.unwrap();
        assert_eq!(message.as_deref(), Some("ok"));
    }

    #[test]
    fn test_segment_encodes_reserved_characters() {
        assert_eq!(segment("a/b c"), "a%2Fb%20c");
        assert_eq!(segment("plain-id"), "plain-id");
    }
}
