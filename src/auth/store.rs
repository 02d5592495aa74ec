use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::credential::Credential;
use super::error::AuthError;

/// Storage key holding the bearer credential.
pub const CREDENTIAL_KEY: &str = "fishchi-token";

const STORAGE_FILE: &str = "storage.toml";
const STORAGE_FILE_VERSION: u32 = 1;

/// Host-provided persistent async key-value storage.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, AuthError>;
    async fn set_item(&self, key: &str, value: &str) -> Result<(), AuthError>;
    async fn remove_item(&self, key: &str) -> Result<(), AuthError>;
}

/// File-backed key-value storage using a single TOML document.
///
/// # Example
/// ```no_run
/// use fishchi::auth::{FileKeyValueStorage, KeyValueStorage};
///
/// # async fn example() -> Result<(), fishchi::auth::AuthError> {
/// let storage = FileKeyValueStorage::new(std::path::PathBuf::from("/tmp/fishchi"));
/// storage.set_item("fishchi-token", "t1").await?;
/// assert_eq!(storage.get_item("fishchi-token").await?.as_deref(), Some("t1"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileKeyValueStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileKeyValueStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            path: base_dir.join(STORAGE_FILE),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> Result<StorageFile, AuthError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StorageFile::empty())
            }
            Err(err) => return Err(err.into()),
        };
        Ok(toml::from_str(&raw)?)
    }

    async fn write_file(&self, mut file: StorageFile) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        file.saved_at = Utc::now();
        let serialized = toml::to_string(&file)?;
        tokio::fs::write(&self.path, serialized).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStorage for FileKeyValueStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, AuthError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_file().await?.items.remove(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), AuthError> {
        let _guard = self.lock.lock().await;
        let mut file = self.read_file().await?;
        file.items.insert(key.to_string(), value.to_string());
        self.write_file(file).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), AuthError> {
        let _guard = self.lock.lock().await;
        let mut file = self.read_file().await?;
        if file.items.remove(key).is_none() {
            return Ok(());
        }
        self.write_file(file).await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StorageFile {
    version: u32,
    saved_at: DateTime<Utc>,
    #[serde(default)]
    items: BTreeMap<String, String>,
}

impl StorageFile {
    fn empty() -> Self {
        Self {
            version: STORAGE_FILE_VERSION,
            saved_at: Utc::now(),
            items: BTreeMap::new(),
        }
    }
}

/// Best-effort persistence of the single bearer credential.
///
/// Storage failures are logged here and never surface: `get` reads them as
/// "no credential", `set` and `remove` just report them. The in-memory auth
/// state stays the source of truth for the running session.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    pub async fn get(&self) -> Option<Credential> {
        match self.storage.get_item(CREDENTIAL_KEY).await {
            Ok(value) => {
                let credential = value.and_then(Credential::parse);
                tracing::debug!(found = credential.is_some(), "credential lookup");
                credential
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored credential");
                None
            }
        }
    }

    /// Returns whether the write reached storage.
    pub async fn set(&self, credential: &Credential) -> bool {
        match self.storage.set_item(CREDENTIAL_KEY, credential.expose()).await {
            Ok(()) => {
                tracing::debug!("credential saved");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to save credential");
                false
            }
        }
    }

    /// Returns whether the removal reached storage.
    pub async fn remove(&self) -> bool {
        match self.storage.remove_item(CREDENTIAL_KEY).await {
            Ok(()) => {
                tracing::debug!("credential removed");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to remove credential");
                false
            }
        }
    }
}

impl CredentialStore {
    /// Remove the stored credential only if it is still `expected`.
    ///
    /// Lets a login attempt discard its own credential without wiping one a
    /// newer attempt stored meanwhile. Returns whether a removal happened.
    pub async fn remove_if(&self, expected: &Credential) -> bool {
        match self.storage.get_item(CREDENTIAL_KEY).await {
            Ok(Some(stored)) if stored == expected.expose() => self.remove().await,
            Ok(_) => {
                tracing::debug!("stored credential was replaced, keeping it");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored credential");
                false
            }
        }
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("key", &CREDENTIAL_KEY)
            .finish()
    }
}
