//! Internal HTTP client that handles authentication and automatic ticket refresh.

use crate::{
    auth::application::service::login_service::LoginService,
    config::ValidationConfig,
    core::domain::{
        error::{ProxmoxError, ProxmoxResult, ValidationError},
        model::{
            proxmox_auth::ProxmoxAuth,
            proxmox_connection::{ProxmoxConnection, ProxmoxCredentials},
        },
    },
};
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{Client, StatusCode, header::AUTHORIZATION};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};
use url::Url;

/// The `{ "data": ... }` envelope every API answer is wrapped in.
#[derive(Deserialize)]
struct ApiResponse<T> {
    data: T,
}

/// Internal HTTP client that manages authentication and provides methods to call the Proxmox API.
///
/// With password credentials the client adds the `PVEAuthCookie` and `CSRFPreventionToken`
/// headers to each request; if a request receives a `401 Unauthorized` response it logs in
/// again once and retries. With API token credentials every request carries the
/// `Authorization: PVEAPIToken=...` header and no login takes place.
#[derive(Debug)]
pub struct ApiClient {
    http_client: Client,
    connection: Arc<ProxmoxConnection>,
    auth: Arc<RwLock<Option<ProxmoxAuth>>>,
    config: Arc<ValidationConfig>,
    rate_limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl ApiClient {
    /// Creates a new `ApiClient`. The client starts unauthenticated.
    ///
    /// # Errors
    /// Returns `ProxmoxError::Connection` if the HTTP client cannot be built, or
    /// `ProxmoxError::Validation` for a zero rate limit.
    pub fn new(connection: ProxmoxConnection, config: ValidationConfig) -> ProxmoxResult<Self> {
        let http_client = Client::builder()
            .danger_accept_invalid_certs(connection.accepts_invalid_certs())
            .build()
            .map_err(|e| ProxmoxError::Connection(e.to_string()))?;

        let rate_limiter = match config.rate_limit {
            Some(rl) => {
                let per_second = non_zero("rate_limit.requests_per_second", rl.requests_per_second)?;
                let burst = non_zero("rate_limit.burst_size", rl.burst_size)?;
                let quota = Quota::per_second(per_second).allow_burst(burst);
                Some(Arc::new(DefaultDirectRateLimiter::direct(quota)))
            }
            None => None,
        };

        Ok(Self {
            http_client,
            connection: Arc::new(connection),
            auth: Arc::new(RwLock::new(None)),
            config: Arc::new(config),
            rate_limiter,
        })
    }

    /// Sets the authentication state (used after a successful login).
    pub async fn set_auth(&self, auth: ProxmoxAuth) {
        let mut lock = self.auth.write().await;
        *lock = Some(auth);
    }

    /// Returns the current authentication state, if any.
    pub async fn auth(&self) -> Option<ProxmoxAuth> {
        self.auth.read().await.clone()
    }

    /// Returns `true` if requests can be authenticated right now.
    pub async fn is_authenticated(&self) -> bool {
        if !self.uses_tickets() {
            return true;
        }
        let lock = self.auth.read().await;
        lock.as_ref()
            .map(|a| !a.ticket().is_expired(self.config.ticket_lifetime))
            .unwrap_or(false)
    }

    /// Logs in eagerly so credential problems surface before any resource call.
    ///
    /// # Errors
    /// Returns the login error for password credentials; token credentials
    /// are checked by the first request instead.
    pub async fn login(&self) -> ProxmoxResult<()> {
        if self.uses_tickets() {
            self.refresh_auth().await?;
        }
        Ok(())
    }

    /// Performs an authenticated GET request and unwraps the `data` envelope.
    ///
    /// # Type Parameters
    /// - `T`: The expected payload type (must implement `DeserializeOwned`).
    ///
    /// # Errors
    /// - `ProxmoxError::Api` if the server answers with an error status
    /// - `ProxmoxError::Authentication` if the request stays unauthorized
    /// - `ProxmoxError::Connection` if the request fails or the payload cannot be parsed
    pub async fn get<T>(&self, path: &str, query: &[(&str, &str)]) -> ProxmoxResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.ensure_authenticated().await?;
        let url = self.connection.proxmox_url().api_endpoint(path, query)?;

        let mut response = self.send(&url).await?;
        if response.status() == StatusCode::UNAUTHORIZED && self.uses_tickets() {
            debug!(path, "ticket rejected, logging in again");
            self.refresh_auth().await?;
            // Retry exactly once
            response = self.send(&url).await?;
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ProxmoxError::Authentication(format!(
                "Request to {} was not authorized",
                path
            )));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            let message = status
                .canonical_reason()
                .filter(|_| message.trim().is_empty())
                .map(str::to_string)
                .unwrap_or(message);
            return Err(ProxmoxError::Api {
                status: status.as_u16(),
                path: path.to_string(),
                message,
            });
        }

        response
            .json::<ApiResponse<T>>()
            .await
            .map(|envelope| envelope.data)
            .map_err(|e| ProxmoxError::Connection(format!("Failed to parse response: {}", e)))
    }

    fn uses_tickets(&self) -> bool {
        matches!(
            self.connection.credentials(),
            ProxmoxCredentials::Password { .. }
        )
    }

    async fn send(&self, url: &Url) -> ProxmoxResult<reqwest::Response> {
        // Apply rate limiting if enabled
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }
        trace!(%url, "GET");

        let mut req_builder = self.http_client.get(url.clone());
        match self.connection.credentials() {
            ProxmoxCredentials::Token(token) => {
                req_builder = req_builder.header(AUTHORIZATION, token.as_authorization_header());
            }
            ProxmoxCredentials::Password { .. } => {
                if let Some(auth) = self.auth().await {
                    req_builder = req_builder.header("Cookie", auth.ticket().as_cookie_header());
                    if let Some(csrf) = auth.csrf_token() {
                        req_builder = req_builder.header("CSRFPreventionToken", csrf.as_str());
                    }
                }
            }
        }

        req_builder
            .send()
            .await
            .map_err(|e| ProxmoxError::Connection(format!("HTTP request failed: {}", e)))
    }

    /// Ensures that we have a valid (non‑expired) ticket. If not, attempts to refresh.
    async fn ensure_authenticated(&self) -> ProxmoxResult<()> {
        if !self.is_authenticated().await {
            self.refresh_auth().await?;
        }
        Ok(())
    }

    /// Performs a fresh login using the stored credentials to obtain a new ticket.
    async fn refresh_auth(&self) -> ProxmoxResult<()> {
        let service = LoginService::new();
        let auth = service.execute(&self.http_client, &self.connection).await?;
        self.set_auth(auth).await;
        Ok(())
    }
}

fn non_zero(field: &str, value: u32) -> ProxmoxResult<NonZeroU32> {
    NonZeroU32::new(value).ok_or_else(|| {
        ValidationError::Field {
            field: field.to_string(),
            message: "must be greater than zero".to_string(),
        }
        .into()
    })
}
