use crate::core::domain::error::ValidationError;
use std::net::IpAddr;

const MAX_HOSTNAME_LENGTH: usize = 253;
const MAX_LABEL_LENGTH: usize = 63;

/// A validated Proxmox host address (hostname or IP literal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxmoxHost(String);

impl ProxmoxHost {
    /// Creates a new host without validation.
    pub(crate) fn new_unchecked(host: String) -> Self {
        Self(host)
    }

    /// Returns the host as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the host is an IPv6 literal and needs brackets in URLs.
    #[must_use]
    pub fn is_ipv6(&self) -> bool {
        matches!(self.0.parse::<IpAddr>(), Ok(IpAddr::V6(_)))
    }
}

fn validate_label(label: &str) -> Result<(), ValidationError> {
    if label.is_empty() || label.len() > MAX_LABEL_LENGTH {
        return Err(ValidationError::Format(format!(
            "Label must be between 1 and {} characters",
            MAX_LABEL_LENGTH
        )));
    }
    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::Format(
            "Label can only contain alphanumeric characters and hyphens".to_string(),
        ));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(ValidationError::Format(
            "Label cannot start or end with hyphen".to_string(),
        ));
    }
    Ok(())
}

/// Validates a host: an IP literal, or a hostname following RFC 1035 label rules.
pub(crate) fn validate_host(host: &str) -> Result<(), ValidationError> {
    if host.is_empty() {
        return Err(ValidationError::Field {
            field: "host".to_string(),
            message: "Host cannot be empty".to_string(),
        });
    }
    if host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }
    if host.len() > MAX_HOSTNAME_LENGTH {
        return Err(ValidationError::ConstraintViolation(format!(
            "Host length exceeds maximum of {} characters",
            MAX_HOSTNAME_LENGTH
        )));
    }
    host.split('.').try_for_each(validate_label)
}
