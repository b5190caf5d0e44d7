//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates a display name chosen when creating or joining a session.
///
/// Names must contain a non-blank character, only ASCII letters, digits,
/// underscores, hyphens and whitespace, and at most `max_length` characters.
///
/// # Examples
///
/// ```ignore
/// validate_display_name("Ada", 19)        // Ok
/// validate_display_name("   ", 19)        // Err - blank
/// validate_display_name("Ada!", 19)       // Err - invalid character
/// ```
pub fn validate_display_name(name: &str, max_length: usize) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("name_empty");
        err.message = Some("Enter a Name".into());
        return Err(err);
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c.is_whitespace())
    {
        let mut err = ValidationError::new("name_characters");
        err.message = Some("Name contains invalid characters".into());
        return Err(err);
    }

    if name.chars().count() > max_length {
        let mut err = ValidationError::new("name_length");
        err.message = Some(
            format!(
                "Name must be less than {} characters long",
                max_length + 1
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}
