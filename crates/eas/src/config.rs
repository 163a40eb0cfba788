//! Configuration loading for ActiveSync accounts
//!
//! Supports loading account settings from (in order of priority):
//! 1. JSON file (~/.config/easync/eas-account.json)
//! 2. Runtime environment variables (fallback)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::models::{AccountContext, ConnectionSecurity, ServerSettings};
use crate::retry::RetryPolicy;

/// Account settings filename in the easync config directory
pub const ACCOUNT_FILE: &str = "eas-account.json";

/// Tuning for protocol exchanges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// MS-ASProtocolVersion to speak
    pub protocol_version: String,
    pub user_agent: String,
    /// Upper bound on round-trips in one sync pass
    pub max_rounds: u32,
    pub connect_timeout_secs: u64,
    pub command_timeout_secs: u64,
    /// Read timeout for the first folder sync, which can be slow on
    /// large mailboxes
    pub initial_sync_timeout_secs: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            protocol_version: "14.1".to_string(),
            user_agent: format!("easync/{}", env!("CARGO_PKG_VERSION")),
            max_rounds: 100,
            connect_timeout_secs: 20,
            command_timeout_secs: 30,
            initial_sync_timeout_secs: 120,
        }
    }
}

impl ProtocolConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn initial_sync_timeout(&self) -> Duration {
        Duration::from_secs(self.initial_sync_timeout_secs)
    }
}

/// Identity and server of one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSettings {
    pub email: String,
    /// Generated on first use when absent
    #[serde(default)]
    pub device_id: Option<String>,
    pub server: ServerSettings,
}

/// Everything needed to run the backend for one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EasConfig {
    pub account: AccountSettings,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl EasConfig {
    pub fn new(account: AccountSettings) -> Self {
        Self {
            account,
            protocol: ProtocolConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Load settings using the following priority:
    /// 1. JSON file (~/.config/easync/eas-account.json)
    /// 2. Runtime environment variables
    pub fn load() -> Result<Self> {
        if config::config_exists(ACCOUNT_FILE) {
            return config::load_json(ACCOUNT_FILE);
        }
        Self::from_env()
    }

    /// Load settings from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }

    /// Load settings from EAS_* environment variables
    pub fn from_env() -> Result<Self> {
        let email = std::env::var("EAS_EMAIL").context(
            "Account settings not found. Create ~/.config/easync/eas-account.json \
             or set EAS_EMAIL, EAS_HOST, EAS_USERNAME and EAS_PASSWORD",
        )?;
        let host = std::env::var("EAS_HOST").context("EAS_HOST not set")?;
        let username = std::env::var("EAS_USERNAME").unwrap_or_else(|_| email.clone());
        let password = std::env::var("EAS_PASSWORD").context("EAS_PASSWORD not set")?;

        let mut server = ServerSettings::new(host, username, password);
        if let Ok(port) = std::env::var("EAS_PORT") {
            server.port = port
                .parse()
                .with_context(|| format!("Invalid EAS_PORT: {}", port))?;
        }
        if std::env::var("EAS_INSECURE").is_ok_and(|v| v == "1") {
            server.connection_security = ConnectionSecurity::None;
        }

        Ok(Self::new(AccountSettings {
            email,
            device_id: std::env::var("EAS_DEVICE_ID").ok(),
            server,
        }))
    }

    /// Fill in a device id if none is configured. Returns true when one was
    /// generated, so the caller can persist it.
    pub fn ensure_device_id(&mut self) -> bool {
        if self.account.device_id.as_deref().is_some_and(|id| !id.is_empty()) {
            return false;
        }
        self.account.device_id = Some(uuid::Uuid::new_v4().simple().to_string());
        true
    }

    /// Persist settings to the easync config directory
    pub fn save(&self) -> Result<()> {
        config::save_json(ACCOUNT_FILE, self)
    }

    /// Build the account context. Fails if no device id has been assigned.
    pub fn account_context(&self) -> Result<AccountContext> {
        let device_id = self
            .account
            .device_id
            .clone()
            .filter(|id| !id.is_empty())
            .context("Device id missing; call ensure_device_id first")?;
        Ok(AccountContext::new(
            device_id,
            self.account.email.clone(),
            self.account.server.clone(),
            self.protocol.protocol_version.clone(),
        ))
    }
}
