//! Secure token stores
//!
//! The interceptor treats persistent storage as an opaque async key-value
//! store holding two string secrets. Three implementations ship with the
//! crate:
//!
//! - [`MemoryTokenStore`] - process-local, for tests and ephemeral sessions
//! - [`FileTokenStore`] - JSON file with user-only permissions
//! - `KeyringTokenStore` - OS keychain (feature `keyring`)

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Application directory name under the platform config directory
const APP_DIR: &str = "bearer-guard";

/// Token file name
const TOKEN_FILE: &str = "tokens.json";

/// Errors that can occur during token storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error during file storage operations
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// OS keychain error
    #[cfg(feature = "keyring")]
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Any other backend failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Async key-value contract for persisting session secrets
///
/// Implementations must be safe for concurrent use. The interceptor imposes
/// no locking contract beyond last-write-wins.
#[async_trait]
pub trait SecureTokenStore: Send + Sync {
    /// Read a value; `None` when the key is absent
    ///
    /// # Errors
    /// Returns `StorageError` if the backend cannot be read.
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    ///
    /// # Errors
    /// Returns `StorageError` if the backend cannot be written.
    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value; deleting an absent key succeeds
    ///
    /// # Errors
    /// Returns `StorageError` if the backend cannot be written.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Delete every value held by this store
    ///
    /// # Errors
    /// Returns `StorageError` if the backend cannot be written.
    async fn delete_all(&self) -> Result<(), StorageError>;
}

#[async_trait]
impl<T: SecureTokenStore + ?Sized> SecureTokenStore for Arc<T> {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).read(key).await
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).write(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        (**self).delete(key).await
    }

    async fn delete_all(&self) -> Result<(), StorageError> {
        (**self).delete_all().await
    }
}

/// Type alias for a shared token store
pub type SharedTokenStore = Arc<dyn SecureTokenStore>;

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local token store
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: std::sync::Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with entries
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: std::sync::Mutex::new(entries),
        }
    }

    /// Number of stored entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl SecureTokenStore for MemoryTokenStore {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StorageError> {
        self.lock().clear();
        Ok(())
    }
}

// ============================================================================
// File store
// ============================================================================

/// Token store backed by a JSON object file
///
/// The file is written with user-only permissions (0600) on Unix.
/// Read-modify-write cycles are serialized within the process.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    io_lock: tokio::sync::Mutex<()>,
}

impl Default for FileTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTokenStore {
    /// Create a store at the default path (platform-specific config directory)
    #[must_use]
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        Self::with_path(config_dir.join(TOKEN_FILE))
    }

    /// Create a store at a custom path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Get the storage path
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, String>, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.path, content).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&self.path, perms).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl SecureTokenStore for FileTokenStore {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.io_lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.io_lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.io_lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_some() {
            self.save(&entries).await?;
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StorageError> {
        let _guard = self.io_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Keyring store
// ============================================================================

#[cfg(feature = "keyring")]
pub use keyring_store::KeyringTokenStore;

#[cfg(feature = "keyring")]
mod keyring_store {
    use async_trait::async_trait;
    use keyring::Entry;

    use super::{SecureTokenStore, StorageError};
    use crate::types::StorageKeys;

    /// Default keychain service name
    const DEFAULT_SERVICE: &str = "bearer-guard";

    /// Token store backed by the OS keychain
    ///
    /// Each key is one keychain entry under the configured service name.
    /// Keychain calls block, so they run on the blocking thread pool.
    #[derive(Debug, Clone)]
    pub struct KeyringTokenStore {
        service: String,
        keys: StorageKeys,
    }

    impl Default for KeyringTokenStore {
        fn default() -> Self {
            Self::new(DEFAULT_SERVICE, StorageKeys::default())
        }
    }

    impl KeyringTokenStore {
        /// Create a store for `service`; `keys` are the entries removed by
        /// `delete_all`
        pub fn new(service: impl Into<String>, keys: StorageKeys) -> Self {
            Self {
                service: service.into(),
                keys,
            }
        }

        async fn blocking<T, F>(&self, key: &str, op: F) -> Result<T, StorageError>
        where
            T: Send + 'static,
            F: FnOnce(Entry) -> Result<T, keyring::Error> + Send + 'static,
        {
            let service = self.service.clone();
            let key = key.to_string();
            tokio::task::spawn_blocking(move || {
                let entry = Entry::new(&service, &key)?;
                op(entry)
            })
            .await
            .map_err(|e| StorageError::backend(format!("Keyring task failed: {e}")))?
            .map_err(StorageError::from)
        }
    }

    #[async_trait]
    impl SecureTokenStore for KeyringTokenStore {
        async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.blocking(key, |entry| match entry.get_password() {
                Ok(value) => Ok(Some(value)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(e),
            })
            .await
        }

        async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
            let value = value.to_string();
            self.blocking(key, move |entry| entry.set_password(&value))
                .await
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.blocking(key, |entry| match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(e),
            })
            .await
        }

        async fn delete_all(&self) -> Result<(), StorageError> {
            let access = self.keys.access_token.clone();
            let refresh = self.keys.refresh_token.clone();
            self.delete(&access).await?;
            self.delete(&refresh).await
        }
    }
}
