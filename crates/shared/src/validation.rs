//! Common validation utilities.

use validator::ValidationError;

/// Maximum length of a device display name, in characters.
pub const MAX_DEVICE_NAME_LENGTH: usize = 50;

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Trims a user-entered display name.
///
/// Returns `None` when nothing but whitespace was entered.
pub fn normalize_device_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Validates the length of an already normalized display name.
pub fn validate_device_name_length(name: &str) -> Result<(), ValidationError> {
    if name.chars().count() <= MAX_DEVICE_NAME_LENGTH {
        Ok(())
    } else {
        let mut err = ValidationError::new("device_name_length");
        err.message = Some(
            format!(
                "Device name must be at most {} characters",
                MAX_DEVICE_NAME_LENGTH
            )
            .into(),
        );
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_latitude() {
        assert!(validate_latitude(0.0).is_ok());
        assert!(validate_latitude(90.0).is_ok());
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(90.1).is_err());
        assert!(validate_latitude(-90.1).is_err());
    }

    #[test]
    fn test_validate_latitude_error_message() {
        let err = validate_latitude(100.0).unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Latitude must be between -90 and 90"
        );
    }

    #[test]
    fn test_validate_longitude() {
        assert!(validate_longitude(0.0).is_ok());
        assert!(validate_longitude(180.0).is_ok());
        assert!(validate_longitude(-180.0).is_ok());
        assert!(validate_longitude(180.1).is_err());
        assert!(validate_longitude(-180.1).is_err());
    }

    #[test]
    fn test_validate_longitude_error_message() {
        let err = validate_longitude(200.0).unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Longitude must be between -180 and 180"
        );
    }

    #[test]
    fn test_normalize_device_name_rejects_blank() {
        assert_eq!(normalize_device_name(""), None);
        assert_eq!(normalize_device_name("   "), None);
        assert_eq!(normalize_device_name("\t\n "), None);
    }

    #[test]
    fn test_normalize_device_name_trims() {
        assert_eq!(
            normalize_device_name("  kitchen "),
            Some("kitchen".to_string())
        );
        assert_eq!(
            normalize_device_name("living room"),
            Some("living room".to_string())
        );
    }

    #[test]
    fn test_validate_device_name_length() {
        assert!(validate_device_name_length("den").is_ok());
        assert!(validate_device_name_length(&"a".repeat(MAX_DEVICE_NAME_LENGTH)).is_ok());
        assert!(validate_device_name_length(&"a".repeat(MAX_DEVICE_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_device_name_length_counts_chars() {
        // Multi-byte characters count once each
        let name = "é".repeat(MAX_DEVICE_NAME_LENGTH);
        assert!(validate_device_name_length(&name).is_ok());
    }
}
