use crate::{
    config::ValidationConfig,
    core::{
        domain::{
            error::{ProxmoxResult, ValidationError},
            model::proxmox_connection::{ProxmoxConnection, ProxmoxCredentials},
            value_object::{
                ProxmoxApiToken, ProxmoxHost, ProxmoxPassword, ProxmoxPort, ProxmoxRealm,
                ProxmoxUrl, ProxmoxUsername, strip_realm, validate_api_token, validate_host,
                validate_password, validate_port, validate_realm, validate_username,
            },
        },
        infrastructure::api_client::ApiClient,
    },
    inventory::application::request::resolve_request::ResolveRequest,
};
use tracing::{debug, instrument};

pub(crate) const MISSING_CREDENTIALS: &str = "You must provide either 'username', 'password' and 'realm' or 'token' and 'secret' for the Proxmox plugin";

/// Builds the authenticated API client for one resolution run.
#[derive(Debug, Clone, Default)]
pub struct ClientFactory {
    config: ValidationConfig,
}

impl ClientFactory {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validates the options and turns them into connection settings.
    ///
    /// The password set wins when both credential sets are present.
    ///
    /// # Errors
    /// Returns `ProxmoxError::Validation` if neither credential set is complete
    /// or any value is malformed.
    pub fn client_config(
        &self,
        request: &ResolveRequest,
    ) -> ProxmoxResult<(ProxmoxHost, ProxmoxConnection)> {
        let credentials = self.credentials(request)?;

        let host = request.host.as_deref().map(str::trim).unwrap_or_default();
        validate_host(host)?;
        let host = ProxmoxHost::new_unchecked(host.to_string());

        let port = request.port.unwrap_or(self.config.default_port);
        validate_port(port)?;
        let port = ProxmoxPort::new_unchecked(port);

        let url = ProxmoxUrl::from_parts(&host, port)?;
        let verify_ssl = request.verify_ssl.unwrap_or(true);
        let connection = ProxmoxConnection::new(host.clone(), port, credentials, verify_ssl, url);
        Ok((host, connection))
    }

    /// Builds the client and logs in, so bad credentials fail the run right away.
    ///
    /// # Errors
    /// Propagates validation, connection and authentication errors.
    #[instrument(skip_all, fields(host = request.host.as_deref().unwrap_or_default()))]
    pub async fn execute(&self, request: &ResolveRequest) -> ProxmoxResult<ApiClient> {
        let (_, connection) = self.client_config(request)?;
        debug!(
            url = %connection.proxmox_url().as_url(),
            port = connection.proxmox_port().get(),
            mode = connection.credentials().mode(),
            principal = %connection.credentials().principal(),
            verify_ssl = !connection.accepts_invalid_certs(),
            "building API client"
        );

        let mut config = self.config.clone();
        if request.rate_limit.is_some() {
            config.rate_limit = request.rate_limit;
        }

        let client = ApiClient::new(connection, config)?;
        client.login().await?;
        Ok(client)
    }

    fn credentials(&self, request: &ResolveRequest) -> ProxmoxResult<ProxmoxCredentials> {
        if let (Some(username), Some(password), Some(realm)) = (
            present(&request.username),
            present(&request.password),
            present(&request.realm),
        ) {
            let username = strip_realm(username, realm);
            validate_username(username, self.config.block_reserved_usernames)?;
            validate_password(password)?;
            validate_realm(realm)?;
            return Ok(ProxmoxCredentials::Password {
                username: ProxmoxUsername::new_unchecked(username.to_string()),
                password: ProxmoxPassword::new_unchecked(password.to_string()),
                realm: ProxmoxRealm::new_unchecked(realm.to_string()),
                otp: present(&request.otp).map(str::to_string),
            });
        }

        if let (Some(token), Some(secret)) = (present(&request.token), present(&request.secret)) {
            validate_api_token(token, secret)?;
            return Ok(ProxmoxCredentials::Token(ProxmoxApiToken::new_unchecked(
                token.to_string(),
                secret.to_string(),
            )));
        }

        Err(ValidationError::Plugin(MISSING_CREDENTIALS.to_string()).into())
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
