//! Persistence layer for Share Location.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Device record repositories (Postgres and in-memory)
//! - The file-backed key/value store holding the device identity

pub mod db;
pub mod entities;
pub mod key_value;
pub mod memory;
pub mod metrics;
pub mod repositories;

pub use key_value::FileKeyValueStore;
pub use memory::InMemoryDeviceRecords;
pub use repositories::DeviceRecordRepository;
