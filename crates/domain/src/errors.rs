//! Domain error types.
//!
//! Collaborator failures are typed per collaborator and converge into
//! [`SharingError`], which carries the title and message shown to the user.

use serde::Serialize;
use thiserror::Error;

/// Failures reported by a device record repository.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error: {0}")]
    Backend(String),

    /// The backend refused a write because another record holds the name.
    #[error("Device name already used: {0}")]
    NameConflict(String),

    #[error("Device record not found: {0}")]
    NotFound(i64),
}

/// Failures reported by a location source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

/// Failures reported by the device identity store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityStoreError {
    #[error("identity store failed: {0}")]
    Storage(String),

    #[error("identity data corrupt: {0}")]
    Corrupt(String),
}

/// Coarse classification of a [`SharingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    PermissionDenied,
    LocationUnavailable,
    Network,
    Backend,
}

/// Errors surfaced to the user by the sharing session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SharingError {
    #[error("Device name is required")]
    DeviceNameRequired,

    #[error("Device name is too long")]
    DeviceNameTooLong,

    #[error("Device name already used: {0}")]
    DeviceNameTaken(String),

    #[error("Device name cannot change while sharing")]
    DeviceNameLocked,

    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl SharingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SharingError::DeviceNameRequired
            | SharingError::DeviceNameTooLong
            | SharingError::DeviceNameTaken(_)
            | SharingError::DeviceNameLocked => ErrorKind::Validation,
            SharingError::PermissionDenied => ErrorKind::PermissionDenied,
            SharingError::LocationUnavailable(_) => ErrorKind::LocationUnavailable,
            SharingError::Network(_) => ErrorKind::Network,
            SharingError::Backend(_) => ErrorKind::Backend,
        }
    }

    /// Short headline for the alert shown to the user.
    pub fn title(&self) -> &'static str {
        match self {
            SharingError::DeviceNameRequired => "Device Name is required.",
            SharingError::DeviceNameTooLong => "Device Name is too long.",
            SharingError::DeviceNameTaken(_) => "Already Used Device Name.",
            SharingError::DeviceNameLocked => "Device Name is locked.",
            SharingError::PermissionDenied => "Location permission denied.",
            SharingError::LocationUnavailable(_) => "Location unavailable.",
            SharingError::Network(_) => "Connection failed.",
            SharingError::Backend(_) => "Failed.",
        }
    }

    /// Body text for the alert shown to the user.
    pub fn message(&self) -> String {
        match self {
            SharingError::DeviceNameRequired => "Please input Device Name.".to_string(),
            SharingError::DeviceNameTooLong => format!(
                "Please use at most {} characters.",
                shared::validation::MAX_DEVICE_NAME_LENGTH
            ),
            SharingError::DeviceNameTaken(_) => "Please input New Device Name.".to_string(),
            SharingError::DeviceNameLocked => {
                "Stop sharing before changing the Device Name.".to_string()
            }
            SharingError::PermissionDenied => {
                "Allow location access to share your location.".to_string()
            }
            SharingError::LocationUnavailable(_) => {
                "Could not read the current position.".to_string()
            }
            SharingError::Network(_) => "Could not reach the location server.".to_string(),
            SharingError::Backend(_) => "Share Location.".to_string(),
        }
    }
}

impl From<RepositoryError> for SharingError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Network(msg) => SharingError::Network(msg),
            RepositoryError::Backend(msg) => SharingError::Backend(msg),
            RepositoryError::NameConflict(name) => SharingError::DeviceNameTaken(name),
            RepositoryError::NotFound(id) => {
                SharingError::Backend(format!("device record {} not found", id))
            }
        }
    }
}

impl From<LocationError> for SharingError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::PermissionDenied => SharingError::PermissionDenied,
            LocationError::Unavailable(msg) => SharingError::LocationUnavailable(msg),
        }
    }
}
