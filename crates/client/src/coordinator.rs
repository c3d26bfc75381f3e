//! Single-flight access token refresh.
//!
//! Every authenticated call goes through [`AuthCoordinator::send`]. When a
//! call comes back 401 the coordinator either starts a refresh cycle (if
//! none is running) or parks the caller on the running one. A cycle issues
//! exactly one refresh call, persists the new token, and then settles every
//! parked caller in FIFO order: each one replays its request with the new
//! token, or fails with the same [`RefreshError`].
//!
//! # State
//!
//! ```text
//!            401, idle
//!   IDLE ─────────────────▶ REFRESHING ──┐ 401: enqueue
//!    ▲                          │  ◀─────┘
//!    └──── refresh settled ─────┘
//! ```
//!
//! The `refreshing` flag and the waiter queue share one mutex. The flag
//! check, the transition and the enqueue happen under that lock with no
//! `.await` in between, so two concurrent 401s can never both start a
//! refresh.
//!
//! The cycle itself runs on a spawned task. A caller that drops its future
//! mid-cycle only drops its receiver; the queue is still drained and the
//! flag still reset.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use crate::config::RefreshPolicy;
use crate::error::{ApiError, RefreshError};
use crate::events::{SessionEvent, SessionEvents};
use crate::refresh::{TokenPair, refresh_access_token};
use crate::storage::CredentialStore;
use crate::transport::{ApiRequest, ApiResponse, Transport};

type RefreshOutcome = Result<SecretString, Arc<RefreshError>>;

/// Observable refresh state, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    /// No refresh in flight.
    Idle,
    /// A refresh call is in flight with `queued` callers waiting on it.
    Refreshing { queued: usize },
}

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// Wraps outgoing calls so expired access tokens are recovered
/// transparently.
///
/// Construct one per process and hand clones to every API surface; clones
/// share the same state.
#[derive(Clone)]
pub struct AuthCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    events: SessionEvents,
    policy: RefreshPolicy,
    state: Mutex<RefreshState>,
}

impl AuthCoordinator {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        events: SessionEvents,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                transport,
                store,
                events,
                policy,
                state: Mutex::new(RefreshState::default()),
            }),
        }
    }

    /// The credential store tokens are read from and written to.
    #[must_use]
    pub fn store(&self) -> &dyn CredentialStore {
        self.inner.store.as_ref()
    }

    /// The session event hub.
    #[must_use]
    pub fn events(&self) -> &SessionEvents {
        &self.inner.events
    }

    /// Current refresh phase.
    #[must_use]
    pub fn phase(&self) -> RefreshPhase {
        let state = self.lock_state();
        if state.refreshing {
            RefreshPhase::Refreshing {
                queued: state.waiters.len(),
            }
        } else {
            RefreshPhase::Idle
        }
    }

    /// Send `request` with the stored access token, recovering from 401.
    ///
    /// Non-401 responses (success or not) are returned unmodified. A 401 is
    /// answered by a refresh and a single replay; if the replay is 401 as
    /// well, that response is returned as is.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the request could not be delivered
    /// and `ApiError::SessionExpired` if the token could not be refreshed.
    #[instrument(
        skip(self, request),
        fields(method = %request.method, path = %request.path, request_id = %request.request_id)
    )]
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let sent_with = self.inner.store.access_token();
        let response = self
            .inner
            .transport
            .execute(request, sent_with.as_ref())
            .await?;

        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("access token rejected");
        let token = self.recover(sent_with.as_ref()).await?;

        debug!("replaying with refreshed token");
        Ok(self.inner.transport.execute(request, Some(&token)).await?)
    }

    /// Send `request` without credentials and without 401 interception.
    ///
    /// Used for login-style calls where a 401 means "wrong password", not
    /// "token expired".
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the request could not be delivered.
    pub async fn send_anonymous(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        Ok(self.inner.transport.execute(request, None).await?)
    }

    /// Obtain a token to replay with after a 401.
    async fn recover(&self, sent_with: Option<&SecretString>) -> Result<SecretString, ApiError> {
        let receiver = {
            let mut state = self.lock_state();

            if !state.refreshing {
                match self.inner.store.access_token() {
                    // Signed out: there is nothing to refresh.
                    None => {
                        return Err(ApiError::SessionExpired(Arc::new(
                            RefreshError::MissingRefreshToken,
                        )));
                    }
                    // A cycle finished after this request went out.
                    Some(current)
                        if sent_with
                            .is_none_or(|sent| sent.expose_secret() != current.expose_secret()) =>
                    {
                        debug!("stale token, replaying with the current one");
                        return Ok(current);
                    }
                    Some(_) => {}
                }
            }

            let (sender, receiver) = oneshot::channel();
            state.waiters.push_back(sender);

            if state.refreshing {
                debug!(queued = state.waiters.len(), "refresh in flight, waiting");
            } else {
                state.refreshing = true;
                let coordinator = self.clone();
                tokio::spawn(async move { coordinator.run_refresh_cycle().await });
            }

            receiver
        };

        match receiver.await {
            Ok(Ok(token)) => Ok(token),
            Ok(Err(error)) => Err(ApiError::SessionExpired(error)),
            Err(_) => Err(ApiError::SessionExpired(Arc::new(RefreshError::Abandoned))),
        }
    }

    /// One refresh cycle: refresh, persist or clear, settle every waiter.
    ///
    /// Tokens are only written back if the session that sent the refresh
    /// token is still the stored one. A logout (or a new login) during the
    /// call wins: waiters fail with `SignedOut` and no event is published.
    async fn run_refresh_cycle(self) {
        info!("refreshing access token");

        let sent = self.inner.store.refresh_token();
        let outcome: RefreshOutcome = match self.refresh(sent.as_ref()).await {
            Ok(pair) => {
                let access_token = pair.access_token.clone();
                let rotated = sent.as_ref().is_some_and(|sent| {
                    self.inner
                        .store
                        .rotate_tokens(sent, pair.access_token, pair.refresh_token)
                });
                if rotated {
                    Ok(access_token)
                } else {
                    warn!("session ended during refresh, discarding new token");
                    Err(Arc::new(RefreshError::SignedOut))
                }
            }
            Err(error) if self.session_replaced(sent.as_ref()) => {
                warn!(error = %error, "token refresh failed after the session ended");
                Err(Arc::new(RefreshError::SignedOut))
            }
            Err(error) => {
                warn!(error = %error, "token refresh failed, clearing credentials");
                self.inner.store.clear();
                Err(Arc::new(error))
            }
        };

        let waiters = {
            let mut state = self.lock_state();
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };

        let settled = waiters.len();
        for waiter in waiters {
            // A dropped receiver means the caller went away.
            let _ = waiter.send(outcome.clone());
        }

        match outcome {
            Ok(_) => {
                info!(settled, "access token refreshed");
                self.inner.events.publish(SessionEvent::Refreshed);
            }
            Err(error) if matches!(*error, RefreshError::SignedOut) => {
                debug!(settled, "refresh settled for an ended session");
            }
            Err(error) => {
                tokio::time::sleep(self.inner.policy.expiry_notice_delay).await;
                self.inner.events.publish(SessionEvent::Expired {
                    login_route: self.inner.policy.login_route.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    /// Whether the stored refresh token changed since `sent` was read.
    fn session_replaced(&self, sent: Option<&SecretString>) -> bool {
        let Some(sent) = sent else {
            return false;
        };
        self.inner
            .store
            .refresh_token()
            .is_none_or(|current| current.expose_secret() != sent.expose_secret())
    }

    async fn refresh(
        &self,
        refresh_token: Option<&SecretString>,
    ) -> Result<TokenPair, RefreshError> {
        let refresh_token = refresh_token.ok_or(RefreshError::MissingRefreshToken)?;

        let timeout = self.inner.policy.timeout;
        tokio::time::timeout(
            timeout,
            refresh_access_token(
                self.inner.transport.as_ref(),
                &self.inner.policy.refresh_path,
                refresh_token,
            ),
        )
        .await
        .map_err(|_| RefreshError::Timeout(timeout))?
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
