//! Remote device record repository contract.

use uuid::Uuid;

use crate::errors::RepositoryError;
use crate::models::{DeviceRecord, DeviceRecordPatch, NewDeviceRecord};

/// Storage for device records, addressed by exact-match queries.
///
/// Every call is a round trip to the backend. Implementations stamp
/// `create_at` and `update_at` with their own clock, never the caller's.
#[async_trait::async_trait]
pub trait DeviceRecordStore: Send + Sync {
    /// Find the record owned by `device_id`.
    async fn find_by_device_id(
        &self,
        device_id: Uuid,
    ) -> Result<Option<DeviceRecord>, RepositoryError>;

    /// Find the record currently holding `device_name`.
    async fn find_by_device_name(
        &self,
        device_name: &str,
    ) -> Result<Option<DeviceRecord>, RepositoryError>;

    /// Insert a new record and return it as stored.
    async fn insert(&self, record: NewDeviceRecord) -> Result<DeviceRecord, RepositoryError>;

    /// Merge `patch` over the record with the given id and return the result.
    async fn update(
        &self,
        id: i64,
        patch: DeviceRecordPatch,
    ) -> Result<DeviceRecord, RepositoryError>;
}
