//! Device record repository for database operations.

use sqlx::PgPool;
use uuid::Uuid;

use domain::errors::RepositoryError;
use domain::models::{DeviceRecord, DeviceRecordPatch, NewDeviceRecord};
use domain::services::DeviceRecordStore;

use crate::entities::DeviceRecordEntity;
use crate::metrics::QueryTimer;

/// Unique constraint guarding display names.
const DEVICE_NAME_CONSTRAINT: &str = "device_records_device_name_key";

/// Repository for device record database operations.
///
/// Timestamps are taken from the database clock.
#[derive(Clone)]
pub struct DeviceRecordRepository {
    pool: PgPool,
}

impl DeviceRecordRepository {
    /// Creates a new DeviceRecordRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DeviceRecordStore for DeviceRecordRepository {
    async fn find_by_device_id(
        &self,
        device_id: Uuid,
    ) -> Result<Option<DeviceRecord>, RepositoryError> {
        let timer = QueryTimer::new("find_by_device_id");
        let result = sqlx::query_as::<_, DeviceRecordEntity>(
            r#"
            SELECT id, device_id, device_name, device_type, latitude, longitude,
                   is_active, create_at, update_at
            FROM device_records
            WHERE device_id = $1
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result
            .map(|row| row.map(Into::into))
            .map_err(|e| map_sqlx_error(e, None))
    }

    async fn find_by_device_name(
        &self,
        device_name: &str,
    ) -> Result<Option<DeviceRecord>, RepositoryError> {
        let timer = QueryTimer::new("find_by_device_name");
        let result = sqlx::query_as::<_, DeviceRecordEntity>(
            r#"
            SELECT id, device_id, device_name, device_type, latitude, longitude,
                   is_active, create_at, update_at
            FROM device_records
            WHERE device_name = $1
            LIMIT 1
            "#,
        )
        .bind(device_name)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result
            .map(|row| row.map(Into::into))
            .map_err(|e| map_sqlx_error(e, None))
    }

    async fn insert(&self, record: NewDeviceRecord) -> Result<DeviceRecord, RepositoryError> {
        let timer = QueryTimer::new("insert_device_record");
        let result = sqlx::query_as::<_, DeviceRecordEntity>(
            r#"
            INSERT INTO device_records (device_id, device_name, device_type, latitude, longitude, is_active, create_at, update_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING id, device_id, device_name, device_type, latitude, longitude, is_active, create_at, update_at
            "#,
        )
        .bind(record.device_id)
        .bind(&record.device_name)
        .bind(&record.device_type)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(record.is_active)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        result
            .map(Into::into)
            .map_err(|e| map_sqlx_error(e, Some(&record.device_name)))
    }

    async fn update(
        &self,
        id: i64,
        patch: DeviceRecordPatch,
    ) -> Result<DeviceRecord, RepositoryError> {
        let timer = QueryTimer::new("update_device_record");
        let result = sqlx::query_as::<_, DeviceRecordEntity>(
            r#"
            UPDATE device_records
            SET device_name = COALESCE($2, device_name),
                latitude = COALESCE($3, latitude),
                longitude = COALESCE($4, longitude),
                is_active = COALESCE($5, is_active),
                update_at = NOW()
            WHERE id = $1
            RETURNING id, device_id, device_name, device_type, latitude, longitude, is_active, create_at, update_at
            "#,
        )
        .bind(id)
        .bind(patch.device_name.as_deref())
        .bind(patch.latitude)
        .bind(patch.longitude)
        .bind(patch.is_active)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        match result {
            Ok(Some(row)) => Ok(row.into()),
            Ok(None) => Err(RepositoryError::NotFound(id)),
            Err(e) => Err(map_sqlx_error(e, patch.device_name.as_deref())),
        }
    }
}

/// Classify a database error for the sharing session.
///
/// Connectivity problems are network errors; a unique violation on the
/// display name becomes a name conflict; anything else is a backend error.
fn map_sqlx_error(err: sqlx::Error, device_name: Option<&str>) -> RepositoryError {
    match &err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => RepositoryError::Network(err.to_string()),
        sqlx::Error::Database(db_err)
            if db_err.is_unique_violation()
                && db_err.constraint() == Some(DEVICE_NAME_CONSTRAINT) =>
        {
            RepositoryError::NameConflict(device_name.unwrap_or_default().to_string())
        }
        _ => {
            tracing::error!(error = %err, "Device record query failed");
            RepositoryError::Backend(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_network_errors() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut, None),
            RepositoryError::Network(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed, None),
            RepositoryError::Network(_)
        ));
    }

    #[test]
    fn test_io_errors_are_network_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(
            map_sqlx_error(sqlx::Error::Io(io), None),
            RepositoryError::Network(_)
        ));
    }

    #[test]
    fn test_other_errors_are_backend_errors() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound, Some("den")),
            RepositoryError::Backend(_)
        ));
    }
}
