//! Durable local key-value storage.
//!
//! Stores persist small JSON documents under fixed keys (see [`keys`]).
//! Two backends are provided:
//!
//! - [`FileStorage`] - one file per key inside a data directory
//! - [`MemoryStorage`] - process-local map, used by tests and ephemeral sessions
//!
//! Reads of malformed documents never fail the caller: [`load_or_default`]
//! logs the problem and hands back an empty value instead.

mod file;
mod memory;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Storage keys used by the storefront stores.
pub mod keys {
    /// Cart line snapshot.
    pub const CART: &str = "cart";

    /// Applied discount code and coin-redemption flag.
    pub const CART_ADJUSTMENTS: &str = "cart.adjustments";

    /// Guest (unauthenticated) wishlist snapshot.
    pub const GUEST_WISHLIST: &str = "wishlist.guest";

    /// Persisted authenticated session.
    pub const SESSION: &str = "session";
}

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failed.
    #[error("storage I/O error for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Value could not be serialized.
    #[error("failed to encode value for key '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Key contains characters that cannot be mapped to a storage slot.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// A durable string store addressed by key.
///
/// Implementations must be cheap to call from synchronous code; the cart
/// store writes through on every mutation.
pub trait LocalStorage: Send + Sync {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Shared handle to a storage backend.
pub type SharedStorage = Arc<dyn LocalStorage>;

/// Load a JSON document, falling back to `T::default()` when the key is
/// missing, unreadable or malformed.
pub fn load_or_default<T>(storage: &dyn LocalStorage, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read persisted state, starting empty");
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding malformed persisted state");
            T::default()
        }
    }
}

/// Serialize `value` as JSON and store it under `key`.
///
/// # Errors
///
/// Returns `StorageError` if encoding or the backend write fails.
pub fn save_json<T>(storage: &dyn LocalStorage, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    storage.set(key, &raw)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_key_is_default() {
        let storage = MemoryStorage::new();
        let value: Vec<String> = load_or_default(&storage, keys::CART);
        assert!(value.is_empty());
    }

    #[test]
    fn test_load_malformed_json_is_default() {
        let storage = MemoryStorage::new();
        storage.set(keys::CART, "{not json").unwrap();
        let value: Vec<String> = load_or_default(&storage, keys::CART);
        assert!(value.is_empty());
    }

    #[test]
    fn test_load_wrong_shape_is_default() {
        let storage = MemoryStorage::new();
        storage.set(keys::CART, r#"{"lines": 3}"#).unwrap();
        let value: Vec<String> = load_or_default(&storage, keys::CART);
        assert!(value.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let storage = MemoryStorage::new();
        save_json(&storage, keys::GUEST_WISHLIST, &["a", "b"]).unwrap();
        let value: Vec<String> = load_or_default(&storage, keys::GUEST_WISHLIST);
        assert_eq!(value, vec!["a".to_string(), "b".to_string()]);
    }
}
