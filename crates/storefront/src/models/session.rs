//! Authenticated session types.
//!
//! A [`Session`] is what flips the wishlist from guest to account mode. It
//! carries the bearer token for the remote wishlist API, so the token is
//! kept in a [`SecretString`] and redacted from `Debug` output.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use bazaar_core::{Email, UserId};

use crate::storage::{self, LocalStorage, StorageError, keys};

/// Session-stored user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Account ID.
    pub id: UserId,
    /// Account email address.
    pub email: Email,
}

/// An authenticated session.
#[derive(Clone)]
pub struct Session {
    pub user: CurrentUser,
    token: SecretString,
    pub issued_at: DateTime<Utc>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

impl Session {
    #[must_use]
    pub fn new(user: CurrentUser, token: SecretString) -> Self {
        Self {
            user,
            token,
            issued_at: Utc::now(),
        }
    }

    /// Bearer token for API calls.
    #[must_use]
    pub fn bearer_token(&self) -> &str {
        self.token.expose_secret()
    }

    /// Read the persisted session, if any. Malformed entries are discarded.
    #[must_use]
    pub fn load(storage: &dyn LocalStorage) -> Option<Self> {
        let stored: Option<StoredSession> = storage::load_or_default(storage, keys::SESSION);
        stored.map(Self::from)
    }

    /// Persist this session so later runs start authenticated.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    pub fn save(&self, storage: &dyn LocalStorage) -> Result<(), StorageError> {
        storage::save_json(storage, keys::SESSION, &StoredSession::from(self))
    }

    /// Forget any persisted session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    pub fn forget(storage: &dyn LocalStorage) -> Result<(), StorageError> {
        storage.remove(keys::SESSION)
    }
}

/// On-disk shape of a session.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    user: CurrentUser,
    token: String,
    issued_at: DateTime<Utc>,
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            user: session.user.clone(),
            token: session.bearer_token().to_string(),
            issued_at: session.issued_at,
        }
    }
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self {
            user: stored.user,
            token: SecretString::from(stored.token),
            issued_at: stored.issued_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn session() -> Session {
        Session::new(
            CurrentUser {
                id: UserId::generate(),
                email: Email::parse("buyer@shop.example").unwrap(),
            },
            SecretString::from("tok_abc123"),
        )
    }

    #[test]
    fn test_debug_redacts_token() {
        let output = format!("{:?}", session());
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("tok_abc123"));
    }

    #[test]
    fn test_save_load_forget() {
        let storage = MemoryStorage::new();
        assert!(Session::load(&storage).is_none());

        let original = session();
        original.save(&storage).unwrap();
        let loaded = Session::load(&storage).unwrap();
        assert_eq!(loaded.user, original.user);
        assert_eq!(loaded.bearer_token(), "tok_abc123");

        Session::forget(&storage).unwrap();
        assert!(Session::load(&storage).is_none());
    }
}
