//! In-memory device record store.
//!
//! Mirrors the Postgres repository: unique device ids and display names,
//! repository-stamped timestamps, partial-merge updates. Used for local
//! development without a database and throughout the test suites.

use chrono::Utc;
use std::collections::VecDeque;
use tokio::sync::RwLock;
use uuid::Uuid;

use domain::errors::RepositoryError;
use domain::models::{DeviceRecord, DeviceRecordPatch, NewDeviceRecord};
use domain::services::DeviceRecordStore;

/// Number of applied updates kept for inspection; older entries are dropped.
pub const UPDATE_LOG_LIMIT: usize = 256;

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<DeviceRecord>,
    next_id: i64,
    updates: VecDeque<(i64, DeviceRecordPatch)>,
    inserts: usize,
    failures: VecDeque<RepositoryError>,
}

impl MemoryState {
    fn take_failure(&mut self) -> Result<(), RepositoryError> {
        match self.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn name_taken_by_other(&self, device_name: &str, id: Option<i64>) -> bool {
        self.records
            .iter()
            .any(|r| r.device_name == device_name && Some(r.id) != id)
    }
}

/// Device record store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryDeviceRecords {
    state: RwLock<MemoryState>,
}

impl InMemoryDeviceRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next repository call fail with `err`.
    ///
    /// Queued failures are consumed in order, one per call.
    pub async fn fail_next(&self, err: RepositoryError) {
        self.state.write().await.failures.push_back(err);
    }

    /// Snapshot of every stored record, in insertion order.
    pub async fn records(&self) -> Vec<DeviceRecord> {
        self.state.read().await.records.clone()
    }

    /// The most recent applied updates, oldest first, at most
    /// [`UPDATE_LOG_LIMIT`] of them.
    pub async fn updates(&self) -> Vec<(i64, DeviceRecordPatch)> {
        self.state.read().await.updates.iter().cloned().collect()
    }

    /// Number of successful inserts.
    pub async fn inserts(&self) -> usize {
        self.state.read().await.inserts
    }
}

#[async_trait::async_trait]
impl DeviceRecordStore for InMemoryDeviceRecords {
    async fn find_by_device_id(
        &self,
        device_id: Uuid,
    ) -> Result<Option<DeviceRecord>, RepositoryError> {
        let mut state = self.state.write().await;
        state.take_failure()?;
        Ok(state
            .records
            .iter()
            .find(|r| r.device_id == device_id)
            .cloned())
    }

    async fn find_by_device_name(
        &self,
        device_name: &str,
    ) -> Result<Option<DeviceRecord>, RepositoryError> {
        let mut state = self.state.write().await;
        state.take_failure()?;
        Ok(state
            .records
            .iter()
            .find(|r| r.device_name == device_name)
            .cloned())
    }

    async fn insert(&self, record: NewDeviceRecord) -> Result<DeviceRecord, RepositoryError> {
        let mut state = self.state.write().await;
        state.take_failure()?;

        if state.records.iter().any(|r| r.device_id == record.device_id) {
            return Err(RepositoryError::Backend(format!(
                "device {} already has a record",
                record.device_id
            )));
        }
        if state.name_taken_by_other(&record.device_name, None) {
            return Err(RepositoryError::NameConflict(record.device_name));
        }

        state.next_id += 1;
        let now = Utc::now();
        let stored = DeviceRecord {
            id: state.next_id,
            device_id: record.device_id,
            device_name: record.device_name,
            device_type: record.device_type,
            latitude: Some(record.latitude),
            longitude: Some(record.longitude),
            is_active: record.is_active,
            create_at: now,
            update_at: now,
        };
        state.records.push(stored.clone());
        state.inserts += 1;
        Ok(stored)
    }

    async fn update(
        &self,
        id: i64,
        patch: DeviceRecordPatch,
    ) -> Result<DeviceRecord, RepositoryError> {
        let mut state = self.state.write().await;
        state.take_failure()?;

        if let Some(name) = &patch.device_name {
            if state.name_taken_by_other(name, Some(id)) {
                return Err(RepositoryError::NameConflict(name.clone()));
            }
        }

        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepositoryError::NotFound(id))?;
        patch.apply_to(record, Utc::now());
        let updated = record.clone();

        if state.updates.len() == UPDATE_LOG_LIMIT {
            state.updates.pop_front();
        }
        state.updates.push_back((id, patch));
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::Position;

    fn new_record(name: &str) -> NewDeviceRecord {
        NewDeviceRecord {
            device_id: Uuid::new_v4(),
            device_name: name.to_string(),
            device_type: "android".to_string(),
            latitude: 1.0,
            longitude: 2.0,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() {
        let store = InMemoryDeviceRecords::new();
        let stored = store.insert(new_record("kitchen")).await.unwrap();

        assert_eq!(stored.id, 1);
        assert_eq!(stored.create_at, stored.update_at);
        assert!(stored.is_active);
        assert_eq!(store.inserts().await, 1);
    }

    #[tokio::test]
    async fn test_find_by_device_id_and_name() {
        let store = InMemoryDeviceRecords::new();
        let input = new_record("kitchen");
        let device_id = input.device_id;
        store.insert(input).await.unwrap();

        let by_id = store.find_by_device_id(device_id).await.unwrap();
        let by_name = store.find_by_device_name("kitchen").await.unwrap();

        assert_eq!(by_id, by_name);
        assert!(store.find_by_device_name("den").await.unwrap().is_none());
        assert!(store.find_by_device_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_insert_conflicts() {
        let store = InMemoryDeviceRecords::new();
        store.insert(new_record("kitchen")).await.unwrap();

        let result = store.insert(new_record("kitchen")).await;

        assert_eq!(result, Err(RepositoryError::NameConflict("kitchen".into())));
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let store = InMemoryDeviceRecords::new();
        let stored = store.insert(new_record("kitchen")).await.unwrap();

        let updated = store
            .update(stored.id, DeviceRecordPatch::location(Position::new(5.0, 6.0)))
            .await
            .unwrap();

        assert_eq!(updated.device_name, "kitchen");
        assert_eq!(updated.position(), Some(Position::new(5.0, 6.0)));
        assert!(updated.update_at >= stored.update_at);
        assert_eq!(updated.create_at, stored.create_at);
        assert_eq!(store.updates().await.len(), 1);
    }

    #[tokio::test]
    async fn test_update_log_keeps_most_recent() {
        let store = InMemoryDeviceRecords::new();
        let stored = store.insert(new_record("kitchen")).await.unwrap();

        for step in 0..UPDATE_LOG_LIMIT + 10 {
            let position = Position::new(0.0, step as f64 / 100.0);
            store
                .update(stored.id, DeviceRecordPatch::location(position))
                .await
                .unwrap();
        }

        let updates = store.updates().await;
        assert_eq!(updates.len(), UPDATE_LOG_LIMIT);
        let last = Position::new(0.0, (UPDATE_LOG_LIMIT + 9) as f64 / 100.0);
        assert_eq!(updates.last().unwrap().1, DeviceRecordPatch::location(last));
        let first = Position::new(0.0, 10.0 / 100.0);
        assert_eq!(updates[0].1, DeviceRecordPatch::location(first));
    }

    #[tokio::test]
    async fn test_update_rename_to_taken_name_conflicts() {
        let store = InMemoryDeviceRecords::new();
        let kitchen = store.insert(new_record("kitchen")).await.unwrap();
        store.insert(new_record("den")).await.unwrap();

        let result = store
            .update(kitchen.id, DeviceRecordPatch::activate("den", Position::new(0.0, 0.0)))
            .await;

        assert_eq!(result, Err(RepositoryError::NameConflict("den".into())));
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let store = InMemoryDeviceRecords::new();
        let result = store.update(99, DeviceRecordPatch::deactivate()).await;
        assert_eq!(result, Err(RepositoryError::NotFound(99)));
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed_in_order() {
        let store = InMemoryDeviceRecords::new();
        store
            .fail_next(RepositoryError::Network("offline".into()))
            .await;

        assert_eq!(
            store.find_by_device_name("kitchen").await,
            Err(RepositoryError::Network("offline".into()))
        );
        assert_eq!(store.find_by_device_name("kitchen").await, Ok(None));
    }
}
