//! Validation helpers for DTOs.

use validator::ValidationError;

/// Number of digits in a session PIN.
pub const PIN_LENGTH: usize = 6;

/// Validates that a session PIN is exactly six ASCII digits.
///
/// # Examples
///
/// ```ignore
/// validate_pin("042917") // Ok
/// validate_pin("42917")  // Err - too short
/// validate_pin("04291a") // Err - not a digit
/// ```
pub fn validate_pin(pin: &str) -> Result<(), ValidationError> {
    if pin.len() != PIN_LENGTH {
        let mut err = ValidationError::new("pin_length");
        err.message = Some(
            format!(
                "PIN must be exactly {PIN_LENGTH} digits (got {} bytes)",
                pin.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !pin.bytes().all(|b| b.is_ascii_digit()) {
        let mut err = ValidationError::new("pin_format");
        err.message = Some("PIN must contain only the digits 0-9".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_pin_valid() {
        assert!(validate_pin("123456").is_ok());
        assert!(validate_pin("000000").is_ok());
        assert!(validate_pin("999999").is_ok());
    }

    #[test]
    fn test_validate_pin_invalid_length() {
        assert!(validate_pin("12345").is_err()); // too short
        assert!(validate_pin("1234567").is_err()); // too long
        assert!(validate_pin("").is_err());
    }

    #[test]
    fn test_validate_pin_invalid_format() {
        assert!(validate_pin("12345a").is_err());
        assert!(validate_pin("12 456").is_err());
        assert!(validate_pin("١٢٣٤").is_err()); // non-ASCII digits
    }
}
