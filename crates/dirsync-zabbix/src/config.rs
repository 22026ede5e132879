//! Zabbix client configuration.

use serde::{Deserialize, Serialize};

use dirsync_core::error::{SyncError, SyncResult};

/// How to authenticate against the Zabbix frontend.
///
/// Any other configured mode fails at config load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Session token obtained from `user.login`.
    #[default]
    Webform,
    /// HTTP basic auth on every request, in addition to the login call.
    Http,
}

/// Configuration for the Zabbix client.
#[derive(Clone, Serialize, Deserialize)]
pub struct ZabbixConfig {
    /// Frontend base URL (e.g. `https://zabbix.example.com/zabbix`).
    pub server: String,

    /// API username.
    pub username: String,

    /// API password.
    pub password: String,

    /// Authentication mode.
    #[serde(default)]
    pub auth: AuthMethod,

    /// Skip TLS certificate verification.
    #[serde(default)]
    pub ignore_tls_errors: bool,
}

impl std::fmt::Debug for ZabbixConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZabbixConfig")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"***REDACTED***")
            .field("auth", &self.auth)
            .field("ignore_tls_errors", &self.ignore_tls_errors)
            .finish()
    }
}

impl ZabbixConfig {
    /// Create a new config with required fields.
    pub fn new(
        server: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            username: username.into(),
            password: password.into(),
            auth: AuthMethod::default(),
            ignore_tls_errors: false,
        }
    }

    /// Set the auth mode.
    #[must_use]
    pub fn with_auth(mut self, auth: AuthMethod) -> Self {
        self.auth = auth;
        self
    }

    /// The JSON-RPC endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("{}/api_jsonrpc.php", self.server.trim_end_matches('/'))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if !self.server.starts_with("http://") && !self.server.starts_with("https://") {
            return Err(SyncError::invalid_configuration(format!(
                "zabbix server must be an http(s) URL, got '{}'",
                self.server
            )));
        }
        if self.username.is_empty() {
            return Err(SyncError::invalid_configuration("zabbix username is empty"));
        }
        Ok(())
    }
}
