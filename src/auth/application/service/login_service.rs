use crate::{
    auth::application::{
        request::login_request::LoginRequest, response::login_response::LoginResponse,
    },
    core::domain::{
        error::{ProxmoxError, ProxmoxResult, ValidationError},
        model::{
            proxmox_auth::ProxmoxAuth,
            proxmox_connection::{ProxmoxConnection, ProxmoxCredentials},
        },
        value_object::{ProxmoxCSRFToken, ProxmoxTicket, validate_csrf_token, validate_ticket},
    },
};

use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use tracing::{debug, instrument};

/// Obtains a ticket and CSRF token from `access/ticket`.
pub struct LoginService {
    default_headers: HeaderMap,
}

impl LoginService {
    pub fn new() -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Self { default_headers }
    }

    /// Logs in with the connection's password credentials.
    ///
    /// # Errors
    /// - `ProxmoxError::Authentication` for rejected credentials, a missing
    ///   second factor, or token credentials (which never log in)
    /// - `ProxmoxError::Connection` if the server is unreachable or answers unexpectedly
    /// - `ProxmoxError::Validation` if the returned ticket is malformed
    #[instrument(skip_all, fields(host = connection.proxmox_host().as_str()))]
    pub async fn execute(
        &self,
        http_client: &Client,
        connection: &ProxmoxConnection,
    ) -> ProxmoxResult<ProxmoxAuth> {
        let request = self.build_login_request(connection)?;
        let url = connection
            .proxmox_url()
            .api_endpoint("access/ticket", &[])?;

        debug!(username = %request.username, realm = %request.realm, "requesting ticket");
        let response = http_client
            .post(url)
            .headers(self.default_headers.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProxmoxError::Connection(e.to_string()))?;

        match response.status() {
            StatusCode::OK => self.handle_successful_login(response).await,
            StatusCode::UNAUTHORIZED => Err(ProxmoxError::Authentication(
                "Invalid credentials provided".to_string(),
            )),
            StatusCode::BAD_REQUEST => Err(ValidationError::Field {
                field: "request".to_string(),
                message: "Invalid request format".to_string(),
            }
            .into()),
            StatusCode::NOT_FOUND => Err(ProxmoxError::Connection(
                "Login endpoint not found".to_string(),
            )),
            StatusCode::SERVICE_UNAVAILABLE => Err(ProxmoxError::Connection(
                "Proxmox service is currently unavailable".to_string(),
            )),
            status => Err(ProxmoxError::Connection(format!(
                "Unexpected response status: {}",
                status
            ))),
        }
    }

    fn build_login_request(&self, connection: &ProxmoxConnection) -> ProxmoxResult<LoginRequest> {
        match connection.credentials() {
            ProxmoxCredentials::Password {
                username,
                password,
                realm,
                otp,
            } => Ok(LoginRequest {
                username: username.as_str().to_string(),
                password: password.as_str().to_string(),
                realm: realm.as_str().to_string(),
                otp: otp.clone(),
            }),
            ProxmoxCredentials::Token(_) => Err(ProxmoxError::Authentication(
                "API token credentials do not use ticket login".to_string(),
            )),
        }
    }

    async fn handle_successful_login(
        &self,
        response: reqwest::Response,
    ) -> ProxmoxResult<ProxmoxAuth> {
        let login_response = response.json::<LoginResponse>().await.map_err(|e| {
            ProxmoxError::Connection(format!("Failed to parse login response: {}", e))
        })?;
        let data = login_response.data;

        if data.need_tfa == Some(1) {
            return Err(ProxmoxError::Authentication(
                "Account requires a second factor; provide 'otp'".to_string(),
            ));
        }

        validate_ticket(&data.ticket)?;
        validate_csrf_token(&data.csrf_token)?;

        Ok(ProxmoxAuth::new(
            ProxmoxTicket::new_unchecked(data.ticket),
            Some(ProxmoxCSRFToken::new_unchecked(data.csrf_token)),
        ))
    }
}

impl Default for LoginService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::value_object::{
        ProxmoxApiToken, ProxmoxHost, ProxmoxPassword, ProxmoxPort, ProxmoxRealm, ProxmoxUrl,
        ProxmoxUsername,
    };
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, method, path},
    };

    fn password_connection(server_url: &str, otp: Option<&str>) -> ProxmoxConnection {
        ProxmoxConnection::new(
            ProxmoxHost::new_unchecked("localhost".to_string()),
            ProxmoxPort::new_unchecked(8006),
            ProxmoxCredentials::Password {
                username: ProxmoxUsername::new_unchecked("bolt".to_string()),
                password: ProxmoxPassword::new_unchecked("testpass".to_string()),
                realm: ProxmoxRealm::new_unchecked("pve".to_string()),
                otp: otp.map(str::to_string),
            },
            true,
            ProxmoxUrl::new_unchecked(server_url.to_string() + "/"),
        )
    }

    #[tokio::test]
    async fn test_login_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api2/json/access/ticket"))
            .and(body_json(serde_json::json!({
                "username": "bolt",
                "password": "testpass",
                "realm": "pve",
                "otp": "123456"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "ticket": "PVE:bolt@pve:4EEC61E2::sig",
                    "CSRFPreventionToken": "4EEC61E2:abc123"
                }
            })))
            .mount(&mock_server)
            .await;

        let connection = password_connection(&mock_server.uri(), Some("123456"));
        let auth = LoginService::new()
            .execute(&Client::new(), &connection)
            .await
            .unwrap();
        assert_eq!(auth.ticket().as_str(), "PVE:bolt@pve:4EEC61E2::sig");
        assert_eq!(auth.csrf_token().unwrap().as_str(), "4EEC61E2:abc123");
    }

    #[tokio::test]
    async fn test_login_invalid_credentials() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api2/json/access/ticket"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let connection = password_connection(&mock_server.uri(), None);
        let result = LoginService::new()
            .execute(&Client::new(), &connection)
            .await;
        assert!(matches!(result, Err(ProxmoxError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_login_requires_second_factor() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api2/json/access/ticket"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "ticket": "PVE:!tfa!bolt@pve:4EEC61E2::sig",
                    "CSRFPreventionToken": "4EEC61E2:abc123",
                    "NeedTFA": 1
                }
            })))
            .mount(&mock_server)
            .await;

        let connection = password_connection(&mock_server.uri(), None);
        let result = LoginService::new()
            .execute(&Client::new(), &connection)
            .await;
        assert!(matches!(result, Err(ProxmoxError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_token_credentials_do_not_log_in() {
        let connection = ProxmoxConnection::new(
            ProxmoxHost::new_unchecked("localhost".to_string()),
            ProxmoxPort::new_unchecked(8006),
            ProxmoxCredentials::Token(ProxmoxApiToken::new_unchecked(
                "bolt@pve!inventory".to_string(),
                "secret".to_string(),
            )),
            true,
            ProxmoxUrl::new_unchecked("http://127.0.0.1:1/".to_string()),
        );
        let result = LoginService::new()
            .execute(&Client::new(), &connection)
            .await;
        assert!(matches!(result, Err(ProxmoxError::Authentication(_))));
    }
}
