//! Sign-in, sign-out and the customer's account pages.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use threadline_client::{
    ApiClient, ApiError, ApiRequest, AuthTokens, Credentials, SessionEvent,
};
use threadline_core::{Email, Order, UserId, UserProfile};
use tracing::{info, instrument, warn};

use crate::error::AccountError;

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Account operations for the storefront customer.
#[derive(Clone)]
pub struct Account {
    api: ApiClient,
}

impl Account {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Whether credentials are stored.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.api.store().access_token().is_some()
    }

    /// Sign in with email and password.
    ///
    /// On success the credentials are persisted and `Authenticated` is
    /// published. Returns the signed-in user's ID when the backend sent one.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidEmail` before any network call for a
    /// malformed address and `AccountError::InvalidCredentials` when the
    /// backend refuses the login.
    #[instrument(skip(self, email, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Option<UserId>, AccountError> {
        let email = Email::parse(email)?;

        let request = ApiRequest::post("/auth/login").with_json(&LoginRequest {
            email: email.as_str(),
            password: password.expose_secret(),
        })
        .map_err(ApiError::from)?;

        let tokens: AuthTokens = match self.api.execute_anonymous(request).await {
            Ok(body) => body.data,
            Err(ApiError::Status { status, message })
                if status.is_client_error() && status.as_u16() != 429 =>
            {
                return Err(AccountError::InvalidCredentials(message));
            }
            Err(e) => return Err(e.into()),
        };

        let pair = tokens.token_pair().map_err(|_| AccountError::MissingToken)?;
        let user_id = tokens.resolved_user_id();

        let mut credentials = Credentials::new(pair.access_token, pair.refresh_token);
        if let Some(user_id) = &user_id {
            credentials = credentials.with_user_id(user_id.clone());
        }
        if let Some(user) = tokens.user {
            credentials = credentials.with_user(user);
        }
        self.api.store().save(credentials);

        info!(user_id = ?user_id, "signed in");
        self.api.events().publish(SessionEvent::Authenticated {
            user_id: user_id.clone(),
        });
        Ok(user_id)
    }

    /// Store credentials delivered by an OAuth callback.
    pub fn complete_oauth(
        &self,
        token: SecretString,
        refresh_token: Option<SecretString>,
        user_id: Option<UserId>,
    ) {
        let mut credentials = Credentials::new(token, refresh_token);
        if let Some(user_id) = &user_id {
            credentials = credentials.with_user_id(user_id.clone());
        }
        self.api.store().save(credentials);

        info!(user_id = ?user_id, "signed in via OAuth");
        self.api
            .events()
            .publish(SessionEvent::Authenticated { user_id });
    }

    /// Sign out.
    ///
    /// The backend is told on a best-effort basis; local credentials are
    /// cleared whatever it answers.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if self.is_authenticated()
            && let Err(e) = self
                .api
                .execute_empty(ApiRequest::post("/auth/logout"))
                .await
        {
            warn!(error = %e, "logout request failed, clearing credentials anyway");
        }

        self.api.store().clear();
        info!("signed out");
        self.api.events().publish(SessionEvent::LoggedOut);
    }

    /// The signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be fetched.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<UserProfile, AccountError> {
        Ok(self.api.get("/users/profile").await?)
    }

    /// The signed-in user's orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the orders cannot be fetched.
    #[instrument(skip(self))]
    pub async fn orders(&self) -> Result<Vec<Order>, AccountError> {
        Ok(self.api.get("/orders").await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::json;
    use threadline_client::{
        ApiResponse, AuthCoordinator, MemoryCredentialStore, RefreshPolicy, SessionEvents,
        Transport, TransportError,
    };

    use super::*;

    /// Accepts `shopper@example.com` / `hunter22`; logout always fails.
    #[derive(Default)]
    struct AuthServer {
        seen: Mutex<Vec<(String, bool)>>,
    }

    #[async_trait]
    impl Transport for AuthServer {
        async fn execute(
            &self,
            request: &ApiRequest,
            bearer: Option<&SecretString>,
        ) -> Result<ApiResponse, TransportError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.path.clone(), bearer.is_some()));

            let response = match request.path.as_str() {
                "/auth/login" => {
                    let body = request.body.clone().unwrap();
                    if body["email"] == "shopper@example.com" && body["password"] == "hunter22" {
                        ApiResponse::json_value(
                            StatusCode::OK,
                            &json!({"statuscode": 200, "responseBody": {"data": {
                                "token": "t1",
                                "refreshToken": "r1",
                                "user": {"_id": "u1", "name": "Meera"}
                            }}}),
                        )
                    } else {
                        ApiResponse::json_value(
                            StatusCode::UNAUTHORIZED,
                            &json!({"statuscode": 401, "responseBody": {"message": "Invalid email or password"}}),
                        )
                    }
                }
                _ => ApiResponse::json_value(
                    StatusCode::SERVICE_UNAVAILABLE,
                    &json!({"statuscode": 503, "responseBody": {"message": "down"}}),
                ),
            };
            Ok(response)
        }
    }

    fn account(server: Arc<AuthServer>) -> (Account, SessionEvents) {
        let events = SessionEvents::default();
        let api = ApiClient::new(AuthCoordinator::new(
            server,
            Arc::new(MemoryCredentialStore::new()),
            events.clone(),
            RefreshPolicy::default(),
        ));
        (Account::new(api), events)
    }

    #[tokio::test]
    async fn test_login_persists_credentials_and_announces() {
        let (account, events) = account(Arc::new(AuthServer::default()));
        let mut rx = events.subscribe();

        let user_id = account
            .login(" Shopper@Example.com ", &SecretString::from("hunter22"))
            .await
            .unwrap();

        assert_eq!(user_id, Some(UserId::new("u1")));
        assert!(account.is_authenticated());
        let stored = account.api.store().load().unwrap();
        assert_eq!(stored.refresh_token.unwrap().expose_secret(), "r1");
        assert_eq!(stored.user.unwrap()["name"], "Meera");
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::Authenticated {
                user_id: Some(UserId::new("u1"))
            }
        );
    }

    #[tokio::test]
    async fn test_wrong_password_is_invalid_credentials() {
        let server = Arc::new(AuthServer::default());
        let (account, _) = account(server.clone());

        let err = account
            .login("shopper@example.com", &SecretString::from("nope"))
            .await
            .unwrap_err();

        assert!(matches!(err, AccountError::InvalidCredentials(ref m) if m == "Invalid email or password"));
        assert!(!account.is_authenticated());
        // Login never carries a bearer token
        assert_eq!(server.seen.lock().unwrap()[0], ("/auth/login".to_string(), false));
    }

    #[tokio::test]
    async fn test_malformed_email_fails_before_network() {
        let server = Arc::new(AuthServer::default());
        let (account, _) = account(server.clone());

        let err = account
            .login("not-an-email", &SecretString::from("x"))
            .await
            .unwrap_err();

        assert!(matches!(err, AccountError::InvalidEmail(_)));
        assert!(server.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_backend_fails() {
        let (account, events) = account(Arc::new(AuthServer::default()));
        account.complete_oauth(SecretString::from("t9"), None, Some(UserId::new("u9")));
        assert!(account.is_authenticated());

        let mut rx = events.subscribe();
        account.logout().await;

        assert!(!account.is_authenticated());
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::LoggedOut);
    }
}
