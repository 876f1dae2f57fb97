//! Domain services for Share Location.
//!
//! Services contain the collaborator contracts and the business logic that
//! drives a sharing session.

pub mod device_records;
pub mod identity;
pub mod location;
pub mod sharing;

pub use device_records::DeviceRecordStore;
pub use identity::{
    load_or_create_identity, resolve_identity, DeviceIdentity, IdentityResolution,
    IdentityStore, InMemoryIdentityStore,
};
pub use location::{LocationSource, ScriptedLocationSource};
pub use sharing::{Effect, Phase, SessionEvent, SessionState, StartStep, Transition};
