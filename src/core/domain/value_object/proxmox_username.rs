use crate::core::domain::error::ValidationError;

const RESERVED_USERNAMES: [&str; 4] = ["administrator", "nobody", "guest", "www-data"];

/// A validated Proxmox username, without the `@realm` suffix.
#[derive(Debug, Clone)]
pub struct ProxmoxUsername(String);

impl ProxmoxUsername {
    /// Creates a new username without validation.
    pub(crate) fn new_unchecked(username: String) -> Self {
        Self(username)
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Drops an `@realm` suffix when it names `realm`.
///
/// `root@pam` with realm `pam` becomes `root`; a suffix naming another realm
/// is left in place and rejected by [`validate_username`].
pub(crate) fn strip_realm<'a>(username: &'a str, realm: &str) -> &'a str {
    username
        .strip_suffix(realm)
        .and_then(|name| name.strip_suffix('@'))
        .unwrap_or(username)
}

/// Validates a username.
///
/// `block_reserved` rejects well-known system accounts that should not be
/// used for API access.
pub(crate) fn validate_username(
    username: &str,
    block_reserved: bool,
) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::Field {
            field: "username".to_string(),
            message: "Username cannot be empty".to_string(),
        });
    }
    if username.len() > 64 {
        return Err(ValidationError::Format(format!(
            "Username cannot exceed 64 characters (got {})",
            username.len()
        )));
    }
    if username.contains('@') {
        return Err(ValidationError::Format(
            "Username must not include the realm; pass it as 'realm'".to_string(),
        ));
    }
    if username.chars().any(|c| c.is_whitespace() || c == ':' || c == '/') {
        return Err(ValidationError::Format(
            "Username contains invalid characters".to_string(),
        ));
    }
    if block_reserved && RESERVED_USERNAMES.contains(&username) {
        return Err(ValidationError::ConstraintViolation(
            "Username is reserved".to_string(),
        ));
    }
    Ok(())
}
