//! Position domain model.

use serde::{Deserialize, Serialize};
use validator::ValidationError;

/// A latitude/longitude pair reported by a location source.
///
/// Equality is exact on both coordinates; two fixes that differ only in the
/// last decimal place are different positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Checks that both coordinates are within their valid ranges.
    pub fn check_range(&self) -> Result<(), ValidationError> {
        shared::validation::validate_latitude(self.latitude)?;
        shared::validation::validate_longitude(self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_exact_equality() {
        assert_eq!(Position::new(1.0, 1.0), Position::new(1.0, 1.0));
        assert_ne!(Position::new(1.0, 1.0), Position::new(1.0, 1.000001));
        assert_ne!(Position::new(1.0, 1.0), Position::new(2.0, 1.0));
    }

    #[test]
    fn test_position_check_range() {
        assert!(Position::new(13.7563, 100.5018).check_range().is_ok());
        assert!(Position::new(91.0, 0.0).check_range().is_err());
        assert!(Position::new(0.0, -181.0).check_range().is_err());
    }

    #[test]
    fn test_position_deserializes_from_camel_case() {
        let position: Position =
            serde_json::from_str(r#"{"latitude": 51.5, "longitude": -0.12}"#).unwrap();
        assert_eq!(position, Position::new(51.5, -0.12));
    }
}
