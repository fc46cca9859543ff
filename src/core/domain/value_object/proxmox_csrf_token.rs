use crate::core::domain::error::ValidationError;

/// A Proxmox CSRF protection token, issued together with a ticket.
#[derive(Debug, Clone)]
pub struct ProxmoxCSRFToken(String);

impl ProxmoxCSRFToken {
    /// Creates a new CSRF token without validation.
    pub(crate) fn new_unchecked(value: String) -> Self {
        Self(value)
    }

    /// Returns the token value as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validates the format of a CSRF token string.
pub(crate) fn validate_csrf_token(token: &str) -> Result<(), ValidationError> {
    if token.is_empty() {
        return Err(ValidationError::Field {
            field: "csrf_token".to_string(),
            message: "CSRF token cannot be empty".to_string(),
        });
    }
    let parts: Vec<&str> = token.split(':').collect();
    if parts.len() != 2 {
        return Err(ValidationError::Format(
            "CSRF token must be in format TOKENID:VALUE".to_string(),
        ));
    }
    if parts[0].len() != 8 || !parts[0].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::Format(
            "Token ID must be 8 hexadecimal characters".to_string(),
        ));
    }
    Ok(())
}
