use crate::core::domain::error::ValidationError;

/// A Proxmox password (plaintext, only stored for the lifetime of a run).
#[derive(Clone)]
pub struct ProxmoxPassword(String);

impl ProxmoxPassword {
    /// Creates a new password without validation.
    pub(crate) fn new_unchecked(password: String) -> Self {
        Self(password)
    }

    /// Returns the password as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ProxmoxPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ProxmoxPassword(***)")
    }
}

/// Validates a password. Existing account passwords are taken as-is,
/// only empty and oversized values are rejected.
pub(crate) fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Field {
            field: "password".to_string(),
            message: "Password cannot be empty".to_string(),
        });
    }
    if password.len() > 128 {
        return Err(ValidationError::Format(
            "Password cannot exceed 128 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_debug_redacts() {
        let password = ProxmoxPassword::new_unchecked("hunter2".to_string());
        assert_eq!(format!("{:?}", password), "ProxmoxPassword(***)");
        assert_eq!(password.as_str(), "hunter2");
    }
}
