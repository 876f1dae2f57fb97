//! Device record domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Position;

/// The remote document describing one device's sharing status and last
/// known location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    /// Identity assigned by the repository; used to address updates.
    pub id: i64,
    pub device_id: Uuid,
    pub device_name: String,
    pub device_type: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: bool,
    pub create_at: DateTime<Utc>,
    pub update_at: DateTime<Utc>,
}

impl DeviceRecord {
    /// Returns the last reported position, if the record has one.
    pub fn position(&self) -> Option<Position> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Position::new(latitude, longitude)),
            _ => None,
        }
    }
}

/// Fields supplied by the client when creating a device record.
///
/// Timestamps and the record id are assigned by the repository.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeviceRecord {
    pub device_id: Uuid,
    pub device_name: String,
    pub device_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_active: bool,
}

/// Partial update merged over an existing device record.
///
/// `None` fields are left untouched. The repository refreshes `update_at`
/// on every applied patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl DeviceRecordPatch {
    /// Patch written when an existing record starts sharing again.
    pub fn activate(device_name: impl Into<String>, position: Position) -> Self {
        Self {
            device_name: Some(device_name.into()),
            latitude: Some(position.latitude),
            longitude: Some(position.longitude),
            is_active: Some(true),
        }
    }

    /// Patch carrying a freshly sampled position.
    pub fn location(position: Position) -> Self {
        Self {
            latitude: Some(position.latitude),
            longitude: Some(position.longitude),
            ..Self::default()
        }
    }

    /// Patch written when sharing stops.
    pub fn deactivate() -> Self {
        Self {
            is_active: Some(false),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.device_name.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
            && self.is_active.is_none()
    }

    /// Merges this patch over `record`, stamping `update_at` with `now`.
    pub fn apply_to(&self, record: &mut DeviceRecord, now: DateTime<Utc>) {
        if let Some(name) = &self.device_name {
            record.device_name = name.clone();
        }
        if let Some(latitude) = self.latitude {
            record.latitude = Some(latitude);
        }
        if let Some(longitude) = self.longitude {
            record.longitude = Some(longitude);
        }
        if let Some(is_active) = self.is_active {
            record.is_active = is_active;
        }
        record.update_at = now;
    }
}
