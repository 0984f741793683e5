//! Durable local key-value storage.
//!
//! The cart and the auth session are each mirrored into a single slot of a
//! [`KeyValueStorage`]. Values are opaque strings (JSON in practice).
//!
//! # Backends
//!
//! - [`FileStorage`] - one file per key under a data directory
//! - [`MemoryStorage`] - in-process map with latency and failure injection

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::{MemoryStorage, StorageOp};

use async_trait::async_trait;
use thiserror::Error;

/// Storage slot holding the serialized cart.
pub const CART_STORAGE_KEY: &str = "@gtm_cart";

/// Storage slot holding the serialized auth session.
pub const SESSION_STORAGE_KEY: &str = "@gtm_session";

/// Errors that can occur when reading or writing a storage slot.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error on {key}: {source}")]
    Io {
        /// Slot being accessed.
        key: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The key cannot be mapped to a storage location.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// Backend refused the operation (used by test doubles and remote backends).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Async key-value storage with single-slot overwrite semantics.
///
/// Implementations must make `set` a full replacement of the slot and
/// `remove` idempotent.
#[async_trait]
pub trait KeyValueStorage: Send + Sync + 'static {
    /// Read a slot.
    ///
    /// Returns `Ok(None)` if the slot does not exist.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite a slot with `value`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a slot.
    ///
    /// Succeeds even if the slot doesn't exist.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
