use crate::core::domain::value_object::{
    ProxmoxApiToken, ProxmoxHost, ProxmoxPassword, ProxmoxPort, ProxmoxRealm, ProxmoxUrl,
    ProxmoxUsername,
};

/// One of the two accepted ways to authenticate against the API.
#[derive(Debug, Clone)]
pub enum ProxmoxCredentials {
    /// Ticket login with username, password and realm, plus an optional one-time password.
    Password {
        username: ProxmoxUsername,
        password: ProxmoxPassword,
        realm: ProxmoxRealm,
        otp: Option<String>,
    },
    /// Stateless API token.
    Token(ProxmoxApiToken),
}

impl ProxmoxCredentials {
    /// Short label for logs.
    #[must_use]
    pub fn mode(&self) -> &'static str {
        match self {
            ProxmoxCredentials::Password { .. } => "password",
            ProxmoxCredentials::Token(_) => "token",
        }
    }

    /// The account the requests run as: `user@realm` or the token id.
    #[must_use]
    pub fn principal(&self) -> String {
        match self {
            ProxmoxCredentials::Password {
                username, realm, ..
            } => format!("{}@{}", username.as_str(), realm.as_str()),
            ProxmoxCredentials::Token(token) => token.token().to_string(),
        }
    }
}

/// Everything needed to reach and authenticate against one Proxmox VE endpoint.
#[derive(Debug, Clone)]
pub struct ProxmoxConnection {
    proxmox_host: ProxmoxHost,
    proxmox_port: ProxmoxPort,
    credentials: ProxmoxCredentials,
    verify_ssl: bool,
    proxmox_url: ProxmoxUrl,
}

impl ProxmoxConnection {
    pub fn new(
        proxmox_host: ProxmoxHost,
        proxmox_port: ProxmoxPort,
        credentials: ProxmoxCredentials,
        verify_ssl: bool,
        proxmox_url: ProxmoxUrl,
    ) -> Self {
        Self {
            proxmox_host,
            proxmox_port,
            credentials,
            verify_ssl,
            proxmox_url,
        }
    }

    pub fn proxmox_host(&self) -> &ProxmoxHost {
        &self.proxmox_host
    }

    pub fn proxmox_port(&self) -> ProxmoxPort {
        self.proxmox_port
    }

    pub fn credentials(&self) -> &ProxmoxCredentials {
        &self.credentials
    }

    /// Returns `true` if certificate verification is disabled.
    pub fn accepts_invalid_certs(&self) -> bool {
        !self.verify_ssl
    }

    pub fn proxmox_url(&self) -> &ProxmoxUrl {
        &self.proxmox_url
    }
}
