//! Domain layer for Share Location.
//!
//! This crate contains:
//! - Domain models (DeviceRecord, Position)
//! - Collaborator traits for identity storage, location and record storage
//! - The sharing session state machine
//! - Domain error types

pub mod errors;
pub mod models;
pub mod services;
