//! Repository implementations for database operations.

pub mod device_record;

pub use device_record::DeviceRecordRepository;
