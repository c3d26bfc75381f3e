//! Command implementations.
//!
//! Every command runs against a [`Context`] built once from the
//! environment: one credential file, one event hub, one API client shared
//! by the storefront and admin services.

pub mod account;
pub mod admin;
pub mod shop;

use std::sync::Arc;

use threadline_admin::AdminProducts;
use threadline_client::{ClientConfig, FileCredentialStore, SessionEvent, SessionEvents};
use threadline_storefront::Storefront;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Result type shared by every command.
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Services available to commands.
pub struct Context {
    pub storefront: Storefront,
    pub admin: AdminProducts,
}

impl Context {
    /// Load configuration and credentials, then wire the services.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is missing or invalid, or the
    /// credential file cannot be read.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = ClientConfig::from_env()?;
        let store = FileCredentialStore::open(&config.credentials_path)?;
        debug!(path = %store.path().display(), "credential store opened");

        let events = SessionEvents::default();
        spawn_event_logger(&events);

        let storefront = Storefront::from_config(&config, Arc::new(store), events)?;
        let admin = AdminProducts::new(storefront.api().clone());

        Ok(Self { storefront, admin })
    }
}

/// Log session events for the lifetime of the process.
fn spawn_event_logger(events: &SessionEvents) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(SessionEvent::Expired {
                    login_route,
                    reason,
                }) => {
                    warn!(%login_route, %reason, "Session expired, run `tl login` to sign in again");
                }
                Ok(SessionEvent::Refreshed) => debug!("access token refreshed"),
                Ok(SessionEvent::Authenticated { user_id }) => {
                    info!(user_id = ?user_id, "authenticated");
                }
                Ok(SessionEvent::LoggedOut) => info!("logged out"),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "session events skipped"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}
