//! Sharing session shell and external service integrations.

pub mod location_provider;
pub mod sharing;

pub use location_provider::{build_location_source, LocationSetupError};
pub use sharing::{ControllerError, SharingController, SharingDeps, SharingSettings};
