use crate::core::domain::error::ValidationError;

/// A Proxmox API token: the token id (`user@realm!tokenid`) and its secret.
#[derive(Clone)]
pub struct ProxmoxApiToken {
    token: String,
    secret: String,
}

impl ProxmoxApiToken {
    /// Creates a new token without validation.
    pub(crate) fn new_unchecked(token: String, secret: String) -> Self {
        Self { token, secret }
    }

    /// Returns the token id.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Formats the token as an `Authorization` header value.
    #[must_use]
    pub fn as_authorization_header(&self) -> String {
        format!("PVEAPIToken={}={}", self.token, self.secret)
    }
}

impl std::fmt::Debug for ProxmoxApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxmoxApiToken")
            .field("token", &self.token)
            .field("secret", &"***")
            .finish()
    }
}

/// Validates a token id and secret.
pub(crate) fn validate_api_token(token: &str, secret: &str) -> Result<(), ValidationError> {
    if token.is_empty() {
        return Err(ValidationError::Field {
            field: "token".to_string(),
            message: "Token cannot be empty".to_string(),
        });
    }
    if secret.is_empty() {
        return Err(ValidationError::Field {
            field: "secret".to_string(),
            message: "Secret cannot be empty".to_string(),
        });
    }
    let Some((user, token_id)) = token.split_once('!') else {
        return Err(ValidationError::Format(
            "Token must be in format USER@REALM!TOKENID".to_string(),
        ));
    };
    if !user.contains('@') || token_id.is_empty() {
        return Err(ValidationError::Format(
            "Token must be in format USER@REALM!TOKENID".to_string(),
        ));
    }
    Ok(())
}
