use crate::core::domain::{
    error::ValidationError,
    value_object::{proxmox_host::ProxmoxHost, proxmox_port::ProxmoxPort},
};
use url::Url;

const API_PREFIX: &str = "api2/json/";

/// The base URL of a Proxmox VE API endpoint (e.g. `https://pve:8006/`).
#[derive(Debug, Clone)]
pub struct ProxmoxUrl(Url);

impl ProxmoxUrl {
    /// Creates a new URL without validation.
    ///
    /// # Panics
    /// Panics if `url` does not parse.
    #[cfg(test)]
    pub(crate) fn new_unchecked(url: String) -> Self {
        Self(Url::parse(&url).expect("unchecked URL must parse"))
    }

    /// Builds the base URL from host and port, always over HTTPS.
    pub(crate) fn from_parts(
        host: &ProxmoxHost,
        port: ProxmoxPort,
    ) -> Result<Self, ValidationError> {
        let host_part = if host.is_ipv6() {
            format!("[{}]", host.as_str())
        } else {
            host.as_str().to_string()
        };
        let raw = format!("https://{}:{}/", host_part, port.get());
        validate_url(&raw)?;
        Url::parse(&raw)
            .map(Self)
            .map_err(|e| ValidationError::Format(format!("Invalid URL format: {}", e)))
    }

    /// Returns the base URL.
    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Resolves an API path (e.g. `cluster/resources`) with optional query pairs.
    pub fn api_endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ValidationError> {
        let relative = format!("{}{}", API_PREFIX, path.trim_start_matches('/'));
        let mut url = self
            .0
            .join(&relative)
            .map_err(|e| ValidationError::Format(format!("Invalid API path '{}': {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}

/// Validates an API base URL.
pub(crate) fn validate_url(url: &str) -> Result<(), ValidationError> {
    if url.is_empty() {
        return Err(ValidationError::Field {
            field: "url".to_string(),
            message: "URL cannot be empty".to_string(),
        });
    }
    if url.len() > 2083 {
        return Err(ValidationError::Format(
            "URL exceeds maximum length of 2083 characters".to_string(),
        ));
    }
    let parsed =
        Url::parse(url).map_err(|e| ValidationError::Format(format!("Invalid URL format: {}", e)))?;
    if !matches!(parsed.scheme(), "https" | "http") {
        return Err(ValidationError::ConstraintViolation(
            "Invalid scheme. Must be one of: https, http".to_string(),
        ));
    }
    Ok(())
}
