//! Session credential storage.
//!
//! Credentials are persisted under the same four keys the browser client
//! kept in local storage: `token`, `refreshToken`, `user` and `userId`.
//! Stores are synchronous and never fail from the caller's point of view:
//! the in-memory copy is authoritative for the process and persistence
//! problems are logged.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use threadline_core::UserId;
use tracing::{debug, warn};

/// Errors raised while opening a persistent store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Credential file I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Credential file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Credentials for one signed-in session.
#[derive(Clone)]
pub struct Credentials {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub user_id: Option<UserId>,
    /// Cached user profile exactly as the backend returned it.
    pub user: Option<serde_json::Value>,
}

impl Credentials {
    /// Credentials holding only a token pair.
    #[must_use]
    pub const fn new(access_token: SecretString, refresh_token: Option<SecretString>) -> Self {
        Self {
            access_token,
            refresh_token,
            user_id: None,
            user: None,
        }
    }

    #[must_use]
    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: serde_json::Value) -> Self {
        self.user = Some(user);
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("user_id", &self.user_id)
            .field("user", &self.user.as_ref().map(|_| "{..}"))
            .finish()
    }
}

/// Storage for the current session's credentials.
pub trait CredentialStore: Send + Sync {
    /// Current credentials, if signed in.
    fn load(&self) -> Option<Credentials>;

    /// Replace the stored credentials.
    fn save(&self, credentials: Credentials);

    /// Store a refreshed token pair for the session that asked for it.
    ///
    /// Nothing is written unless the stored refresh token is still
    /// `expected_refresh`; returns whether the pair was stored. A `None`
    /// refresh token keeps the existing one (the backend does not always
    /// rotate it).
    fn rotate_tokens(
        &self,
        expected_refresh: &SecretString,
        access_token: SecretString,
        refresh_token: Option<SecretString>,
    ) -> bool;

    /// Forget everything.
    fn clear(&self);

    /// The stored access token.
    fn access_token(&self) -> Option<SecretString> {
        self.load().map(|credentials| credentials.access_token)
    }

    /// The stored refresh token.
    fn refresh_token(&self) -> Option<SecretString> {
        self.load().and_then(|credentials| credentials.refresh_token)
    }
}

/// Signed out or replaced by another login: the pair is dropped.
fn rotate(
    current: Option<&mut Credentials>,
    expected_refresh: &SecretString,
    access_token: SecretString,
    refresh_token: Option<SecretString>,
) -> bool {
    let Some(credentials) = current else {
        return false;
    };
    let same_session = credentials
        .refresh_token
        .as_ref()
        .is_some_and(|stored| stored.expose_secret() == expected_refresh.expose_secret());
    if !same_session {
        return false;
    }

    credentials.access_token = access_token;
    if refresh_token.is_some() {
        credentials.refresh_token = refresh_token;
    }
    true
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: RwLock<Option<Credentials>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that starts signed in.
    #[must_use]
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: RwLock::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<Credentials> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, credentials: Credentials) {
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(credentials);
    }

    fn rotate_tokens(
        &self,
        expected_refresh: &SecretString,
        access_token: SecretString,
        refresh_token: Option<SecretString>,
    ) -> bool {
        let mut guard = self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        rotate(guard.as_mut(), expected_refresh, access_token, refresh_token)
    }

    fn clear(&self) {
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

// =============================================================================
// File-backed store
// =============================================================================

/// On-disk layout, keyed like the browser's local storage.
#[derive(Debug, Serialize, Deserialize)]
struct StoredCredentials {
    token: String,
    #[serde(rename = "refreshToken", default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<serde_json::Value>,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    user_id: Option<UserId>,
}

impl From<&Credentials> for StoredCredentials {
    fn from(credentials: &Credentials) -> Self {
        Self {
            token: credentials.access_token.expose_secret().to_string(),
            refresh_token: credentials
                .refresh_token
                .as_ref()
                .map(|token| token.expose_secret().to_string()),
            user: credentials.user.clone(),
            user_id: credentials.user_id.clone(),
        }
    }
}

impl From<StoredCredentials> for Credentials {
    fn from(stored: StoredCredentials) -> Self {
        Self {
            access_token: SecretString::from(stored.token),
            refresh_token: stored.refresh_token.map(SecretString::from),
            user_id: stored.user_id,
            user: stored.user,
        }
    }
}

/// Write-through JSON file store.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    credentials: RwLock<Option<Credentials>>,
}

impl FileCredentialStore {
    /// Open the store at `path`, reading existing credentials if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let credentials = match fs::read(&path) {
            Ok(bytes) => {
                let stored: StoredCredentials = serde_json::from_slice(&bytes)?;
                debug!(path = %path.display(), "loaded stored credentials");
                Some(Credentials::from(stored))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            credentials: RwLock::new(credentials),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, credentials: Option<&Credentials>) {
        let result = match credentials {
            Some(credentials) => write_atomically(&self.path, &StoredCredentials::from(credentials)),
            None => match fs::remove_file(&self.path) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other.map_err(StorageError::from),
            },
        };

        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "failed to persist credentials");
        }
    }
}

fn write_atomically(path: &Path, stored: &StoredCredentials) -> Result<(), StorageError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(stored)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<Credentials> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, credentials: Credentials) {
        let mut guard = self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        self.persist(Some(&credentials));
        *guard = Some(credentials);
    }

    fn rotate_tokens(
        &self,
        expected_refresh: &SecretString,
        access_token: SecretString,
        refresh_token: Option<SecretString>,
    ) -> bool {
        let mut guard = self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let rotated = rotate(guard.as_mut(), expected_refresh, access_token, refresh_token);
        if rotated {
            self.persist(guard.as_ref());
        }
        rotated
    }

    fn clear(&self) {
        let mut guard = self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        self.persist(None);
        *guard = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("threadline-test-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_memory_update_keeps_refresh_token_when_not_rotated() {
        let store = MemoryCredentialStore::with_credentials(Credentials::new(
            SecretString::from("t1"),
            Some(SecretString::from("r1")),
        ));

        assert!(store.rotate_tokens(
            &SecretString::from("r1"),
            SecretString::from("t2"),
            None
        ));

        assert_eq!(store.access_token().unwrap().expose_secret(), "t2");
        assert_eq!(store.refresh_token().unwrap().expose_secret(), "r1");
    }

    #[test]
    fn test_memory_update_rotates_refresh_token() {
        let store = MemoryCredentialStore::with_credentials(Credentials::new(
            SecretString::from("t1"),
            Some(SecretString::from("r1")),
        ));
        assert!(store.rotate_tokens(
            &SecretString::from("r1"),
            SecretString::from("t2"),
            Some(SecretString::from("r2"))
        ));
        assert_eq!(store.refresh_token().unwrap().expose_secret(), "r2");

        store.clear();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_rotate_does_not_recreate_cleared_session() {
        let store = MemoryCredentialStore::new();

        let rotated = store.rotate_tokens(
            &SecretString::from("r1"),
            SecretString::from("t2"),
            Some(SecretString::from("r2")),
        );

        assert!(!rotated);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_rotate_leaves_newer_session_alone() {
        let store = MemoryCredentialStore::with_credentials(Credentials::new(
            SecretString::from("fresh"),
            Some(SecretString::from("r-fresh")),
        ));

        assert!(!store.rotate_tokens(
            &SecretString::from("r-old"),
            SecretString::from("t2"),
            None
        ));
        assert_eq!(store.access_token().unwrap().expose_secret(), "fresh");
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let credentials = Credentials::new(
            SecretString::from("super-secret"),
            Some(SecretString::from("also-secret")),
        );
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("also-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_file_store_uses_local_storage_keys() {
        let path = temp_path("credentials.json");
        let store = FileCredentialStore::open(&path).unwrap();
        assert!(store.load().is_none());

        store.save(
            Credentials::new(SecretString::from("t1"), Some(SecretString::from("r1")))
                .with_user_id(UserId::new("u1"))
                .with_user(serde_json::json!({"name": "Asha"})),
        );

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["token"], "t1");
        assert_eq!(raw["refreshToken"], "r1");
        assert_eq!(raw["userId"], "u1");
        assert_eq!(raw["user"]["name"], "Asha");
    }

    #[test]
    fn test_file_store_reopens_and_clears() {
        let path = temp_path("credentials.json");
        {
            let store = FileCredentialStore::open(&path).unwrap();
            store.save(Credentials::new(
                SecretString::from("t1"),
                Some(SecretString::from("r1")),
            ));
            assert!(store.rotate_tokens(
                &SecretString::from("r1"),
                SecretString::from("t2"),
                Some(SecretString::from("r2"))
            ));
        }

        let reopened = FileCredentialStore::open(&path).unwrap();
        assert_eq!(reopened.access_token().unwrap().expose_secret(), "t2");
        assert_eq!(reopened.refresh_token().unwrap().expose_secret(), "r2");

        reopened.clear();
        assert!(reopened.load().is_none());
        assert!(!path.exists());

        // Clearing twice is harmless
        reopened.clear();
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let path = temp_path("credentials.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(
            FileCredentialStore::open(&path),
            Err(StorageError::Json(_))
        ));
    }

    #[test]
    fn test_file_store_rotate_after_clear_writes_nothing() {
        let path = temp_path("credentials.json");
        let store = FileCredentialStore::open(&path).unwrap();
        store.save(Credentials::new(
            SecretString::from("t1"),
            Some(SecretString::from("r1")),
        ));
        store.clear();

        assert!(!store.rotate_tokens(
            &SecretString::from("r1"),
            SecretString::from("t2"),
            None
        ));
        assert!(store.load().is_none());
        assert!(!path.exists());
    }
}
