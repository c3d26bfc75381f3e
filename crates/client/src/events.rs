//! Session lifecycle notifications.
//!
//! The hosting application subscribes here instead of the coordinator
//! navigating anywhere itself. `Expired` tells the host to send the user to
//! the login entry point.

use threadline_core::UserId;
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 16;

/// Something happened to the credential session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials were stored after login or an OAuth callback.
    Authenticated { user_id: Option<UserId> },
    /// A refresh cycle obtained a new access token.
    Refreshed,
    /// The user signed out.
    LoggedOut,
    /// The session could not be recovered; credentials are gone.
    Expired {
        /// Where the host should send the user.
        login_route: String,
        /// Human-readable refresh failure.
        reason: String,
    },
}

/// Broadcast hub for [`SessionEvent`]s.
///
/// Cloning yields another handle to the same hub.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SessionEvents {
    /// Create a hub buffering up to `capacity` events per slow subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is fine.
    pub fn publish(&self, event: SessionEvent) {
        match self.sender.send(event) {
            Ok(receivers) => debug!(receivers, "session event published"),
            Err(broadcast::error::SendError(event)) => {
                debug!(?event, "session event dropped, no subscribers");
            }
        }
    }
}
