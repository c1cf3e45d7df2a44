use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

/// Relay settings, read from `IMB_RELAY_*` environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RelayConfig {
    /// Socket address the HTTP server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Fallback tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Shared secret required on `/uplink`
    #[serde(default)]
    pub api_key: Option<String>,

    // Metrics sink
    /// Endpoint decoded records are posted to
    #[serde(default = "default_sink_url")]
    pub sink_url: String,

    /// Bearer token for the sink
    #[serde(default)]
    pub sink_token: Option<String>,

    /// Request timeout for the sink in seconds
    #[serde(default = "default_sink_timeout_secs")]
    pub sink_timeout_secs: u64,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_log_filter() -> String {
    "imb_relay=info,imb_payload=info,imb_sim=info".to_string()
}

fn default_sink_url() -> String {
    "http://localhost:8428/api/v1/import".to_string()
}

fn default_sink_timeout_secs() -> u64 {
    10
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            log_filter: default_log_filter(),
            api_key: None,
            sink_url: default_sink_url(),
            sink_token: None,
            sink_timeout_secs: default_sink_timeout_secs(),
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("IMB_RELAY"))
            .build()?
            .try_deserialize()
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_secs(self.sink_timeout_secs)
    }

    /// API key, treating an empty value as unset
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }
}
