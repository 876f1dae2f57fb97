//! Domain models for Share Location.

pub mod device_record;
pub mod position;

pub use device_record::{DeviceRecord, DeviceRecordPatch, NewDeviceRecord};
pub use position::Position;
