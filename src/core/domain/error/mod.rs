use thiserror::Error;

/// Kind tag attached to validation failures reported back to the plugin host.
pub const VALIDATION_ERROR_KIND: &str = "bolt-plugin/validation-error";

/// The main error type for inventory resolution.
///
/// This enum represents all possible errors that can occur while talking
/// to the Proxmox VE API and reshaping its answers, including connection,
/// authentication, API and validation failures.
#[derive(Error, Debug)]
pub enum ProxmoxError {
    /// Represents errors that occur during connection attempts
    ///
    /// # Fields
    /// * `0` - A description of what went wrong during the connection attempt
    #[error("Connection error: {0}")]
    Connection(String),

    /// Represents authentication failures
    ///
    /// # Fields
    /// * `0` - A description of the authentication failure
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The API answered, but with a non-success status
    ///
    /// # Fields
    /// * `status` - HTTP status code returned by the server
    /// * `path` - API path that was requested
    /// * `message` - Response body, as returned by the server
    #[error("API error ({status}) on {path}: {message}")]
    Api {
        status: u16,
        path: String,
        message: String,
    },

    /// A hostname could not be resolved to an address
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// Represents validation failures with detailed context
    ///
    /// # Fields
    /// * `source` - The underlying validation error
    #[error("Validation error: {source}")]
    Validation {
        #[from]
        source: ValidationError,
    },
}

impl ProxmoxError {
    /// Machine-readable kind string reported to the plugin host.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ProxmoxError::Validation { .. } => VALIDATION_ERROR_KIND,
            ProxmoxError::Authentication(_) => "bolt-plugin/authentication-error",
            ProxmoxError::Api { .. } => "bolt-plugin/api-error",
            ProxmoxError::Connection(_) => "bolt-plugin/connection-error",
            ProxmoxError::Resolution(_) => "bolt-plugin/resolution-error",
        }
    }

    /// Human readable message without the variant prefix for validation errors.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            ProxmoxError::Validation { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }
}

/// Specialized error type for validation failures.
///
/// This enum provides detailed context about why a validation
/// failed, including field-specific errors and format violations.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Represents a validation failure for a specific field
    ///
    /// # Fields
    /// * `field` - The name of the field that failed validation
    /// * `message` - A detailed message about why validation failed
    #[error("Field '{field}' validation failed: {message}")]
    Field { field: String, message: String },

    /// Represents format/syntax validation failures
    ///
    /// # Fields
    /// * `0` - Description of the format violation
    #[error("Format error: {0}")]
    Format(String),

    /// Represents violations of domain constraints
    ///
    /// # Fields
    /// * `0` - Description of the constraint violation
    #[error("Domain constraint violation: {0}")]
    ConstraintViolation(String),

    /// Invalid plugin options, reported verbatim to the caller
    #[error("{0}")]
    Plugin(String),

    /// An API answer could not be reconciled with the guest configuration
    ///
    /// # Fields
    /// * `endpoint` - API path whose answer was unexpected
    /// * `response` - The raw response, for diagnosis
    #[error("Unexpected response from {endpoint}: {response}")]
    Reconciliation { endpoint: String, response: String },
}

/// Type alias for Results that may fail with a ProxmoxError
pub type ProxmoxResult<T> = Result<T, ProxmoxError>;

/// Outcome of an optional remote lookup.
///
/// Sub-lookups (guest agent, container interfaces, node DNS) may legitimately
/// be missing; callers decide whether a missing answer matters.
#[derive(Debug)]
pub enum Lookup<T> {
    /// The lookup succeeded.
    Found(T),
    /// The API answered with an error status (feature not available).
    Unavailable(String),
    /// The request itself failed (transport, authentication).
    Failed(ProxmoxError),
}

impl<T> Lookup<T> {
    /// Classifies the result of a remote call.
    pub fn from_result(result: ProxmoxResult<T>) -> Self {
        match result {
            Ok(value) => Lookup::Found(value),
            Err(ProxmoxError::Api {
                status, message, ..
            }) => Lookup::Unavailable(format!("{status}: {message}")),
            Err(e) => Lookup::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_kind_and_message() {
        let err: ProxmoxError = ValidationError::Plugin("bad options".to_string()).into();
        assert_eq!(err.kind(), VALIDATION_ERROR_KIND);
        assert_eq!(err.message(), "bad options");
        assert!(matches!(
            err,
            ProxmoxError::Validation {
                source: ValidationError::Plugin(_)
            }
        ));
    }

    #[test]
    fn test_lookup_classification() {
        let api: ProxmoxResult<()> = Err(ProxmoxError::Api {
            status: 500,
            path: "nodes/pve1/qemu/100/agent/network-get-interfaces".to_string(),
            message: "QEMU guest agent is not running".to_string(),
        });
        assert!(matches!(Lookup::from_result(api), Lookup::Unavailable(_)));

        let transport: ProxmoxResult<()> = Err(ProxmoxError::Connection("reset".to_string()));
        assert!(matches!(Lookup::from_result(transport), Lookup::Failed(_)));

        assert!(matches!(Lookup::from_result(Ok(7)), Lookup::Found(7)));
    }
}
