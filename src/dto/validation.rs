//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest display name accepted for a player.
const MAX_NAME_LENGTH: usize = 40;

/// Validates that a display name is non-blank and reasonably short.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("name_blank");
        err.message = Some("Display name must not be blank".into());
        return Err(err);
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        let mut err = ValidationError::new("name_length");
        err.message =
            Some(format!("Display name must be at most {MAX_NAME_LENGTH} characters").into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a join code is 4-12 uppercase alphanumeric characters.
///
/// Codes are opaque to the core; this only keeps obviously malformed
/// input out of the code index.
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if !(4..=12).contains(&code.len()) {
        let mut err = ValidationError::new("room_code_length");
        err.message =
            Some(format!("Room code must be 4-12 characters (got {})", code.len()).into());
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code must contain only A-Z and 0-9".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_must_be_non_blank() {
        assert!(validate_display_name("Anna").is_ok());
        assert!(validate_display_name("  ").is_err());
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name(&"x".repeat(41)).is_err());
    }

    #[test]
    fn room_codes_are_uppercase_alphanumeric() {
        assert!(validate_room_code("AB12CD").is_ok());
        assert!(validate_room_code("ZZZZ").is_ok());
        assert!(validate_room_code("ab12cd").is_err()); // lowercase
        assert!(validate_room_code("AB 2CD").is_err()); // space
        assert!(validate_room_code("A1").is_err()); // too short
        assert!(validate_room_code(&"A".repeat(13)).is_err()); // too long
    }
}
