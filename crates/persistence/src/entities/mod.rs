//! Entity definitions (database row mappings).

pub mod device_record;

pub use device_record::DeviceRecordEntity;
