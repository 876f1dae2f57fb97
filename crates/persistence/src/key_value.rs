//! File-backed key/value store for the device identity.
//!
//! The file holds a JSON object mapping keys to entries:
//!
//! ```json
//! { "uuid": { "data": "6f1c…", "expiresAt": null } }
//! ```
//!
//! An entry whose `expiresAt` has passed reads as absent. `null` never expires.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use domain::errors::IdentityStoreError;
use domain::services::identity::{IdentityStore, DEVICE_ID_KEY};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    data: String,
    expires_at: Option<DateTime<Utc>>,
}

type StoredEntries = BTreeMap<String, StoredEntry>;

/// Key/value store persisted as a single JSON file.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    key: String,
    expires: Option<Duration>,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// Store the device identity under the default key, never expiring.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            key: DEVICE_ID_KEY.to_string(),
            expires: None,
            lock: Mutex::new(()),
        }
    }

    /// Expire saved values after `expires`.
    pub fn with_expiration(mut self, expires: Option<Duration>) -> Self {
        self.expires = expires;
        self
    }

    /// Use a different key inside the file.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the value stored under this store's key.
    pub async fn remove(&self) -> Result<(), IdentityStoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = match self.read_entries().await {
            Ok(entries) => entries,
            Err(IdentityStoreError::Corrupt(_)) => StoredEntries::new(),
            Err(e) => return Err(e),
        };
        if entries.remove(&self.key).is_some() {
            self.write_entries(&entries).await?;
        }
        Ok(())
    }

    async fn read_entries(&self) -> Result<StoredEntries, IdentityStoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoredEntries::new()),
            Err(e) => return Err(IdentityStoreError::Storage(e.to_string())),
        };
        if raw.trim().is_empty() {
            return Ok(StoredEntries::new());
        }
        serde_json::from_str(&raw).map_err(|e| IdentityStoreError::Corrupt(e.to_string()))
    }

    async fn write_entries(&self, entries: &StoredEntries) -> Result<(), IdentityStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| IdentityStoreError::Storage(e.to_string()))?;
            }
        }

        let body = serde_json::to_string_pretty(entries)
            .map_err(|e| IdentityStoreError::Storage(e.to_string()))?;

        // Write then rename so a crash never leaves a half-written file.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| IdentityStoreError::Storage(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| IdentityStoreError::Storage(e.to_string()))
    }
}

#[async_trait::async_trait]
impl IdentityStore for FileKeyValueStore {
    async fn load(&self) -> Result<Option<String>, IdentityStoreError> {
        let _guard = self.lock.lock().await;
        let entries = self.read_entries().await?;

        match entries.get(&self.key) {
            Some(entry) => match entry.expires_at {
                Some(expires_at) if expires_at <= Utc::now() => {
                    tracing::debug!(key = %self.key, %expires_at, "Stored value expired");
                    Ok(None)
                }
                _ => Ok(Some(entry.data.clone())),
            },
            None => Ok(None),
        }
    }

    async fn save(&self, device_id: &str) -> Result<(), IdentityStoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = match self.read_entries().await {
            Ok(entries) => entries,
            Err(IdentityStoreError::Corrupt(e)) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Replacing corrupt key/value file");
                StoredEntries::new()
            }
            Err(e) => return Err(e),
        };

        let expires_at = match self.expires {
            Some(ttl) => Some(Utc::now().checked_add_signed(ttl).ok_or_else(|| {
                IdentityStoreError::Storage(format!("expiry of {ttl} is out of range"))
            })?),
            None => None,
        };

        entries.insert(
            self.key.clone(),
            StoredEntry {
                data: device_id.to_string(),
                expires_at,
            },
        );
        self.write_entries(&entries).await
    }
}
