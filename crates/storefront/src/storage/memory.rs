//! In-memory storage backend with operation tracing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{KeyValueStorage, StorageError};

/// Record of a storage operation, for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    /// Slot was read.
    Get {
        /// Key that was read.
        key: String,
    },
    /// Slot was overwritten.
    Set {
        /// Key that was written.
        key: String,
        /// Size of the value written.
        size: usize,
    },
    /// Slot was deleted.
    Remove {
        /// Key that was deleted.
        key: String,
    },
}

/// In-memory key-value storage.
///
/// Cheap to clone; clones share the same map, so a test can keep a handle
/// while a store owns another. Supports simulated latency and injected
/// failures.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<MemoryInner>,
    latency: Option<Duration>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    slots: Mutex<HashMap<String, String>>,
    operations: Mutex<Vec<StorageOp>>,
    fail_reads: Mutex<bool>,
    fail_writes: Mutex<bool>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStorage {
    /// Creates a new empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a handle that delays every operation by `latency`.
    ///
    /// The returned handle shares data with `self`.
    #[must_use]
    pub fn with_latency(&self, latency: Duration) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            latency: Some(latency),
        }
    }

    /// Seed a slot directly, bypassing operation tracing.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        lock(&self.inner.slots).insert(key.into(), value.into());
    }

    /// Peek at a slot directly, bypassing operation tracing.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<String> {
        lock(&self.inner.slots).get(key).cloned()
    }

    /// Whether a slot exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        lock(&self.inner.slots).contains_key(key)
    }

    /// Returns all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StorageOp> {
        lock(&self.inner.operations).clone()
    }

    /// Make subsequent reads fail.
    pub fn fail_reads(&self, fail: bool) {
        *lock(&self.inner.fail_reads) = fail;
    }

    /// Make subsequent writes and deletes fail.
    pub fn fail_writes(&self, fail: bool) {
        *lock(&self.inner.fail_writes) = fail;
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn record(&self, op: StorageOp) {
        lock(&self.inner.operations).push(op);
    }
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.delay().await;
        self.record(StorageOp::Get {
            key: key.to_owned(),
        });

        if *lock(&self.inner.fail_reads) {
            return Err(StorageError::Unavailable(format!("read of {key} refused")));
        }

        Ok(lock(&self.inner.slots).get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.delay().await;
        self.record(StorageOp::Set {
            key: key.to_owned(),
            size: value.len(),
        });

        if *lock(&self.inner.fail_writes) {
            return Err(StorageError::Unavailable(format!("write of {key} refused")));
        }

        lock(&self.inner.slots).insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.delay().await;
        self.record(StorageOp::Remove {
            key: key.to_owned(),
        });

        if *lock(&self.inner.fail_writes) {
            return Err(StorageError::Unavailable(format!("delete of {key} refused")));
        }

        lock(&self.inner.slots).remove(key);
        Ok(())
    }
}
