use crate::error::ValidationError;

/// Characters that would break the one-record-per-line user store format.
const RESERVED: [char; 3] = [',', '\r', '\n'];

/// Validates a user id for registration
///
/// # Arguments
///
/// * `id` - The user id to validate
///
/// # Returns
///
/// Returns `Ok(())` if the id is non-empty and storable, or a
/// `ValidationError::InvalidUserId` otherwise.
///
/// # Examples
///
/// ```rust
/// use turnstile_core::validation::validate_user_id;
///
/// assert!(validate_user_id("alice").is_ok());
/// assert!(validate_user_id("").is_err());
/// assert!(validate_user_id("a,b").is_err());
/// ```
pub fn validate_user_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::InvalidUserId(
            "User ID is required".to_string(),
        ));
    }

    if id.contains(RESERVED) {
        return Err(ValidationError::InvalidUserId(format!(
            "User ID must not contain commas or line breaks: {id:?}"
        )));
    }

    Ok(())
}

/// Validates a role label for registration
///
/// Roles are free-form and may be empty, but must be storable.
pub fn validate_role(role: &str) -> Result<(), ValidationError> {
    if role.contains(RESERVED) {
        return Err(ValidationError::InvalidRole(format!(
            "Role must not contain commas or line breaks: {role:?}"
        )));
    }

    Ok(())
}
