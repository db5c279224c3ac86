//! Invoker configuration.

use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use meridian_proto::DEFAULT_MAX_MESSAGE_SIZE;
use serde::Deserialize;

use crate::error::InvokerError;

/// Configuration for an [`Invoker`](crate::Invoker).
#[derive(Debug, Clone, Deserialize)]
pub struct InvokerConfig {
    /// Address of the agent calls are routed through.
    #[serde(default = "default_agent_address")]
    pub agent_address: String,

    /// Identifier stamped on outbound calls as the calling service.
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

    /// Maximum accepted message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

fn default_agent_address() -> String {
    "127.0.0.1:7401".to_owned()
}

fn default_service_id() -> String {
    "meridian-invoker".to_owned()
}

fn default_environment() -> String {
    "development".to_owned()
}

const fn default_call_timeout_secs() -> u64 {
    30
}

const fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            agent_address: default_agent_address(),
            service_id: default_service_id(),
            game_id: String::new(),
            environment: default_environment(),
            call_timeout_secs: default_call_timeout_secs(),
            max_message_size: default_max_message_size(),
        }
    }
}

impl InvokerConfig {
    /// Loads configuration from `meridian.toml` and `MERIDIAN_`-prefixed
    /// environment variables; the environment overrides the file.
    pub fn load() -> Result<Self, InvokerError> {
        Figment::new()
            .merge(Toml::file("meridian.toml"))
            .merge(Env::prefixed("MERIDIAN_").split("__"))
            .extract()
            .map_err(|e| InvokerError::Config(e.to_string()))
    }

    /// The per-call timeout as a [`Duration`].
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}
