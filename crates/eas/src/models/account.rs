//! Account context passed explicitly through every protocol exchange

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport security for the ActiveSync endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionSecurity {
    /// Plain HTTP
    None,
    /// HTTPS
    #[default]
    SslTls,
}

/// How the client authenticates against the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    /// HTTP Basic with username and password
    #[default]
    Plain,
    /// TLS client certificate
    ClientCertificate,
}

/// Server endpoint and credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub connection_security: ConnectionSecurity,
    #[serde(default)]
    pub auth_type: AuthType,
    pub username: String,
    pub password: String,
}

impl ServerSettings {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: 443,
            connection_security: ConnectionSecurity::SslTls,
            auth_type: AuthType::Plain,
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self.connection_security {
            ConnectionSecurity::None => "http",
            ConnectionSecurity::SslTls => "https",
        }
    }

    fn default_port(&self) -> u16 {
        match self.connection_security {
            ConnectionSecurity::None => 80,
            ConnectionSecurity::SslTls => 443,
        }
    }

    /// Base URL of the ActiveSync endpoint, omitting the port when it is
    /// the scheme default
    pub fn endpoint(&self) -> String {
        if self.port == self.default_port() {
            format!("{}://{}/Microsoft-Server-ActiveSync", self.scheme(), self.host)
        } else {
            format!(
                "{}://{}:{}/Microsoft-Server-ActiveSync",
                self.scheme(),
                self.host,
                self.port
            )
        }
    }
}

impl fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connection_security", &self.connection_security)
            .field("auth_type", &self.auth_type)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Immutable snapshot of everything a round-trip needs to identify the
/// device and account.
///
/// Sync keys are not part of the context: they live in storage and are
/// handed to the executor per call. The policy key is captured when the
/// snapshot is taken; a fresh snapshot is built after provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContext {
    pub device_id: String,
    pub email_address: String,
    pub server: ServerSettings,
    /// MS-ASProtocolVersion sent with every request (e.g. "14.1")
    pub protocol_version: String,
    pub policy_key: Option<String>,
}

impl AccountContext {
    /// Device type reported to the server
    pub const DEVICE_TYPE: &'static str = "Android";

    pub fn new(
        device_id: impl Into<String>,
        email_address: impl Into<String>,
        server: ServerSettings,
        protocol_version: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            email_address: email_address.into(),
            server,
            protocol_version: protocol_version.into(),
            policy_key: None,
        }
    }

    /// Copy of this context carrying a different policy key
    pub fn with_policy_key(&self, policy_key: Option<String>) -> Self {
        Self {
            policy_key,
            ..self.clone()
        }
    }

    /// Value for the X-MS-PolicyKey header
    pub fn policy_key_header(&self) -> &str {
        self.policy_key.as_deref().unwrap_or("0")
    }

    /// Major protocol version as a number (14.1 -> 14.1)
    pub fn protocol_version_number(&self) -> f32 {
        self.protocol_version.parse().unwrap_or(0.0)
    }

    /// SendMail as WBXML arrived with protocol 14.0
    pub fn uses_wbxml_send_mail(&self) -> bool {
        self.protocol_version_number() >= 14.0
    }
}
