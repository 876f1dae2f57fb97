//! Device identity provider.
//!
//! A device is identified by a UUID generated on first launch and persisted
//! in a local key/value store so later launches reuse it.

use std::sync::Mutex;

use uuid::Uuid;

use crate::errors::IdentityStoreError;

/// Key under which the device identifier is persisted.
pub const DEVICE_ID_KEY: &str = "uuid";

/// Durable storage for the device identifier.
#[async_trait::async_trait]
pub trait IdentityStore: Send + Sync {
    /// Load the saved identifier. `Ok(None)` is the expected first-run answer.
    async fn load(&self) -> Result<Option<String>, IdentityStoreError>;

    /// Persist the identifier for future launches, overwriting any previous value.
    async fn save(&self, device_id: &str) -> Result<(), IdentityStoreError>;
}

/// The identifier this installation runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: Uuid,
    /// True when the identifier was generated during this launch.
    pub created: bool,
}

/// Outcome of interpreting whatever the identity store returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityResolution {
    /// A valid identifier was stored; nothing needs to be written.
    Existing(Uuid),
    /// No usable identifier; this fresh one must be saved.
    Generate(Uuid),
}

impl IdentityResolution {
    pub fn device_id(&self) -> Uuid {
        match self {
            IdentityResolution::Existing(id) | IdentityResolution::Generate(id) => *id,
        }
    }
}

/// Decide which identifier to use given the result of a store load.
///
/// Storage failures and unparsable values fail open to a new identifier.
pub fn resolve_identity(
    loaded: Result<Option<String>, IdentityStoreError>,
) -> IdentityResolution {
    match loaded {
        Ok(Some(raw)) => match Uuid::parse_str(raw.trim()) {
            Ok(id) => IdentityResolution::Existing(id),
            Err(e) => {
                tracing::warn!(error = %e, "Stored device id is not a UUID, generating a new one");
                IdentityResolution::Generate(Uuid::new_v4())
            }
        },
        Ok(None) => IdentityResolution::Generate(Uuid::new_v4()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load device id, generating a new one");
            IdentityResolution::Generate(Uuid::new_v4())
        }
    }
}

/// Load the persisted device identifier, creating and saving one if absent.
pub async fn load_or_create_identity(store: &dyn IdentityStore) -> DeviceIdentity {
    match resolve_identity(store.load().await) {
        IdentityResolution::Existing(device_id) => {
            tracing::debug!(device_id = %device_id, "Loaded device id");
            DeviceIdentity {
                device_id,
                created: false,
            }
        }
        IdentityResolution::Generate(device_id) => {
            if let Err(e) = store.save(&device_id.to_string()).await {
                tracing::error!(
                    device_id = %device_id,
                    error = %e,
                    "Failed to persist device id; it will change on next launch"
                );
            } else {
                tracing::info!(device_id = %device_id, "Generated new device id");
            }
            DeviceIdentity {
                device_id,
                created: true,
            }
        }
    }
}

/// In-memory identity store for development and testing.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    value: Option<String>,
    fail_load: bool,
    fail_save: bool,
    saves: usize,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `value`.
    pub fn with_value(value: impl Into<String>) -> Self {
        let store = Self::default();
        store.lock().value = Some(value.into());
        store
    }

    /// Create a store whose reads and writes always fail.
    pub fn failing() -> Self {
        let store = Self::default();
        {
            let mut state = store.lock();
            state.fail_load = true;
            state.fail_save = true;
        }
        store
    }

    pub fn value(&self) -> Option<String> {
        self.lock().value.clone()
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn load(&self) -> Result<Option<String>, IdentityStoreError> {
        let state = self.lock();
        if state.fail_load {
            return Err(IdentityStoreError::Storage("simulated load failure".into()));
        }
        Ok(state.value.clone())
    }

    async fn save(&self, device_id: &str) -> Result<(), IdentityStoreError> {
        let mut state = self.lock();
        if state.fail_save {
            return Err(IdentityStoreError::Storage("simulated save failure".into()));
        }
        state.value = Some(device_id.to_string());
        state.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_existing_identity() {
        let id = Uuid::new_v4();
        assert_eq!(
            resolve_identity(Ok(Some(id.to_string()))),
            IdentityResolution::Existing(id)
        );
    }

    #[test]
    fn test_resolve_absent_identity_generates() {
        assert!(matches!(
            resolve_identity(Ok(None)),
            IdentityResolution::Generate(_)
        ));
    }

    #[test]
    fn test_resolve_fails_open_on_store_error() {
        let resolution = resolve_identity(Err(IdentityStoreError::Storage("disk".into())));
        assert!(matches!(resolution, IdentityResolution::Generate(_)));
    }

    #[test]
    fn test_resolve_corrupt_value_generates() {
        let resolution = resolve_identity(Ok(Some("not-a-uuid".into())));
        assert!(matches!(resolution, IdentityResolution::Generate(_)));
    }

    #[tokio::test]
    async fn test_first_launch_generates_and_saves_once() {
        let store = InMemoryIdentityStore::new();

        let identity = load_or_create_identity(&store).await;

        assert!(identity.created);
        assert_eq!(store.saves(), 1);
        assert_eq!(store.value(), Some(identity.device_id.to_string()));
    }

    #[tokio::test]
    async fn test_identity_survives_restart() {
        let store = InMemoryIdentityStore::new();

        let first = load_or_create_identity(&store).await;
        let second = load_or_create_identity(&store).await;

        assert_eq!(first.device_id, second.device_id);
        assert!(!second.created);
        assert_eq!(store.saves(), 1);
    }

    #[tokio::test]
    async fn test_failing_store_still_yields_identity() {
        let store = InMemoryIdentityStore::failing();

        let identity = load_or_create_identity(&store).await;

        assert!(identity.created);
        assert_eq!(store.value(), None);
    }
}
