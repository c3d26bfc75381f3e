//! Threadline API client.
//!
//! Everything both fronts need to talk to the backend: the HTTP transport,
//! credential storage, session events, and the [`AuthCoordinator`] that
//! turns an expired access token into exactly one refresh call no matter
//! how many requests noticed the expiry at the same time.
//!
//! ```no_run
//! use std::sync::Arc;
//! use threadline_client::{ApiClient, ClientConfig, MemoryCredentialStore, SessionEvents};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let client = ApiClient::from_config(
//!     &config,
//!     Arc::new(MemoryCredentialStore::new()),
//!     SessionEvents::default(),
//! )?;
//! let profile: serde_json::Value = client.get("/users/profile").await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod refresh;
pub mod storage;
pub mod transport;

pub use api::{ApiClient, segment};
pub use config::{ClientConfig, ConfigError, RefreshPolicy};
pub use coordinator::{AuthCoordinator, RefreshPhase};
pub use error::{ApiError, RefreshError, TransportError};
pub use events::{SessionEvent, SessionEvents};
pub use refresh::{AuthTokens, TokenPair};
pub use storage::{
    CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore, StorageError,
};
pub use transport::{ApiRequest, ApiResponse, REQUEST_ID_HEADER, ReqwestTransport, Transport};
