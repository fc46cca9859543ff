use crate::core::domain::error::ValidationError;

/// A validated Proxmox authentication realm (e.g. `pam`, `pve`, or a named LDAP/AD realm).
#[derive(Debug, Clone)]
pub struct ProxmoxRealm(String);

impl ProxmoxRealm {
    /// Creates a new realm without validation.
    pub(crate) fn new_unchecked(realm: String) -> Self {
        Self(realm)
    }

    /// Returns the realm as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validates a realm identifier.
///
/// Realm ids are configured by the cluster administrator, so only the
/// identifier syntax is checked here.
pub(crate) fn validate_realm(realm: &str) -> Result<(), ValidationError> {
    if realm.is_empty() {
        return Err(ValidationError::Field {
            field: "realm".to_string(),
            message: "Realm cannot be empty".to_string(),
        });
    }
    if realm.len() < 2 || realm.len() > 32 {
        return Err(ValidationError::Format(format!(
            "Realm length must be between 2 and 32 characters (got {})",
            realm.len()
        )));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.';
    if !realm.chars().all(allowed) || !realm.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(ValidationError::Format(
            "Realm contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
