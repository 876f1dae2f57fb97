//! Device record entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the device_records table.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceRecordEntity {
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

impl From<DeviceRecordEntity> for domain::models::DeviceRecord {
    fn from(entity: DeviceRecordEntity) -> Self {
        Self {
            id: entity.id,
            device_id: entity.device_id,
            device_name: entity.device_name,
            device_type: entity.device_type,
            latitude: entity.latitude,
            longitude: entity.longitude,
            is_active: entity.is_active,
            create_at: entity.create_at,
            update_at: entity.update_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entity() -> DeviceRecordEntity {
        DeviceRecordEntity {
            id: 1,
            device_id: Uuid::new_v4(),
            device_name: "kitchen".to_string(),
            device_type: "android".to_string(),
            latitude: Some(13.75),
            longitude: Some(100.5),
            is_active: true,
            create_at: Utc::now(),
            update_at: Utc::now(),
        }
    }

    #[test]
    fn test_device_record_entity_to_domain() {
        let entity = create_test_entity();
        let record: domain::models::DeviceRecord = entity.clone().into();

        assert_eq!(record.id, entity.id);
        assert_eq!(record.device_id, entity.device_id);
        assert_eq!(record.device_name, entity.device_name);
        assert_eq!(record.device_type, entity.device_type);
        assert_eq!(record.latitude, entity.latitude);
        assert_eq!(record.longitude, entity.longitude);
        assert_eq!(record.is_active, entity.is_active);
        assert_eq!(record.create_at, entity.create_at);
    }

    #[test]
    fn test_entity_without_fix_has_no_position() {
        let mut entity = create_test_entity();
        entity.latitude = None;
        entity.longitude = None;

        let record: domain::models::DeviceRecord = entity.into();
        assert!(record.position().is_none());
    }
}
