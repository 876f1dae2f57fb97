//! Shared utilities for Share Location.
//!
//! This crate provides common functionality used across all other crates:
//! - Coordinate and display name validation
//! - Formatting helpers for the usage summary panel

pub mod display;
pub mod validation;
