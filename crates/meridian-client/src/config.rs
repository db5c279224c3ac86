//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use meridian_proto::DEFAULT_MAX_MESSAGE_SIZE;
use serde::Deserialize;

use crate::error::ClientError;

/// Configuration for a [`Client`](crate::Client).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Address of the agent this client connects to.
    #[serde(default = "default_agent_address")]
    pub agent_address: String,

    /// Local address the serve loop binds.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Identifier this service registers under.
    #[serde(default = "default_service_id")]
    pub service_id: String,

    /// Tenant game identifier.
    #[serde(default)]
    pub game_id: String,

    /// Tenant environment.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Per-call timeout in seconds.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Interval between heartbeats in seconds.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Delay before reconnect attempts in seconds.
    #[serde(default = "default_reconnect_interval_secs")]
    pub reconnect_interval_secs: u64,

    /// Depth of the inbound message queue while serving.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Maximum accepted message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// TLS material, when the transport is wrapped.
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// Paths to TLS material.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TlsConfig {
    /// CA certificate path.
    pub ca_path: PathBuf,
    /// Client certificate path.
    pub cert_path: PathBuf,
    /// Client key path.
    pub key_path: PathBuf,
}

fn default_agent_address() -> String {
    "127.0.0.1:7401".to_owned()
}

fn default_bind_address() -> String {
    "127.0.0.1:7402".to_owned()
}

fn default_service_id() -> String {
    "meridian-client".to_owned()
}

fn default_environment() -> String {
    "development".to_owned()
}

const fn default_call_timeout_secs() -> u64 {
    30
}

const fn default_heartbeat_interval_secs() -> u64 {
    10
}

const fn default_reconnect_interval_secs() -> u64 {
    5
}

const fn default_max_in_flight() -> usize {
    64
}

const fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            agent_address: default_agent_address(),
            bind_address: default_bind_address(),
            service_id: default_service_id(),
            game_id: String::new(),
            environment: default_environment(),
            call_timeout_secs: default_call_timeout_secs(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            reconnect_interval_secs: default_reconnect_interval_secs(),
            max_in_flight: default_max_in_flight(),
            max_message_size: default_max_message_size(),
            tls: None,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default sources.
    ///
    /// Later sources override earlier ones:
    /// 1. Default values
    /// 2. `meridian.toml` in the current directory (if present)
    /// 3. Environment variables with `MERIDIAN_` prefix
    pub fn load() -> Result<Self, ClientError> {
        Figment::new()
            .merge(Toml::file("meridian.toml"))
            .merge(Env::prefixed("MERIDIAN_").split("__"))
            .extract()
            .map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Loads configuration from a specific TOML file, still honouring the
    /// environment overrides.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ClientError> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("MERIDIAN_").split("__"))
            .extract()
            .map_err(|e| ClientError::Config(e.to_string()))
    }

    /// The per-call timeout as a [`Duration`].
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// The heartbeat interval as a [`Duration`].
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ClientConfig::default();
        assert_eq!(config.call_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_message_size, 4 * 1024 * 1024);
        assert_eq!(config.environment, "development");
        assert!(config.tls.is_none());
    }

    #[test]
    fn config_from_toml() {
        let toml = r#"
            agent_address = "agent.internal:9000"
            service_id = "svc-inventory"
            game_id = "game-1"
            environment = "production"
            call_timeout_secs = 5

            [tls]
            ca_path = "/etc/meridian/ca.pem"
            cert_path = "/etc/meridian/cert.pem"
            key_path = "/etc/meridian/key.pem"
        "#;

        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.agent_address, "agent.internal:9000");
        assert_eq!(config.service_id, "svc-inventory");
        assert_eq!(config.call_timeout(), Duration::from_secs(5));
        // Unspecified fields keep their defaults.
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(10));
        assert_eq!(
            config.tls.unwrap().ca_path,
            PathBuf::from("/etc/meridian/ca.pem")
        );
    }
}
