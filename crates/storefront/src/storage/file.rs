//! File-backed storage: one file per key.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{KeyValueStorage, StorageError};

/// Key-value storage persisted as files under a directory.
///
/// Each key maps to `<dir>/<sanitized-key>.json`. Writes go to a sibling
/// temp file and are renamed into place, so a crash never leaves a half
/// written slot behind.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create storage rooted at `dir`.
    ///
    /// The directory is created lazily on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the slot files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    ///
    /// ASCII letters, digits, `-` and `_` are kept; every other byte is
    /// percent-encoded, so distinct keys never share a file.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidKey` if the key is empty.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }

        let mut name = String::with_capacity(key.len() + 5);
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                name.push(char::from(byte));
            } else {
                name.push_str(&format!("%{byte:02X}"));
            }
        }
        name.push_str(".json");

        Ok(self.dir.join(name))
    }
}

fn io_error(key: &str, source: std::io::Error) -> StorageError {
    StorageError::Io {
        key: key.to_owned(),
        source,
    }
}

#[async_trait]
impl KeyValueStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(key, e))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).await.map_err(|e| io_error(key, e))?;
        fs::rename(&tmp, &path).await.map_err(|e| io_error(key, e))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key, e)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::CART_STORAGE_KEY;

    #[test]
    fn test_path_for_encodes_key() {
        let storage = FileStorage::new("/data");
        assert_eq!(
            storage.path_for(CART_STORAGE_KEY).unwrap(),
            PathBuf::from("/data/%40gtm_cart.json")
        );
        assert_eq!(
            storage.path_for("../up").unwrap(),
            PathBuf::from("/data/%2E%2E%2Fup.json")
        );
    }

    #[test]
    fn test_path_for_keeps_keys_apart() {
        let storage = FileStorage::new("/data");
        let keys = ["@gtm_cart", "#gtm_cart", "_gtm_cart", "%40gtm_cart"];
        let mut paths: Vec<PathBuf> = keys.iter().map(|k| storage.path_for(k).unwrap()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), keys.len());
    }

    #[test]
    fn test_path_for_rejects_empty_key() {
        let storage = FileStorage::new("/data");
        assert!(matches!(storage.path_for(""), Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_similar_keys_use_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.set("@gtm_cart", "cart").await.unwrap();
        storage.set("#gtm_cart", "other").await.unwrap();

        assert_eq!(storage.get("@gtm_cart").await.unwrap().as_deref(), Some("cart"));
        assert_eq!(storage.get("#gtm_cart").await.unwrap().as_deref(), Some("other"));
    }

    #[tokio::test]
    async fn test_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert_eq!(storage.get("slot").await.unwrap(), None);
        storage.set("slot", "[1,2,3]").await.unwrap();
        assert_eq!(storage.get("slot").await.unwrap().as_deref(), Some("[1,2,3]"));

        storage.remove("slot").await.unwrap();
        assert_eq!(storage.get("slot").await.unwrap(), None);
        assert!(!storage.path_for("slot").unwrap().exists());
    }

    #[tokio::test]
    async fn test_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(storage.remove("never-written").await.is_ok());
    }
}
