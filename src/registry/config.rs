//! Registry connection configuration.
//!
//! Consumed by `DiscoverySource` implementations to reach the registry and
//! by `DiscoveryManager` for the initial-fetch timeout. The struct follows
//! the builder convention used across the crate's configuration types.

use serde::{Deserialize, Serialize};

/// Default timeout for the initial blocking fetch, in seconds.
pub const DEFAULT_FETCH_TIMEOUT: u64 = 30;
/// Default timeout for transport connections, in seconds.
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 30;

/// Connection settings for a registry-backed discovery source.
///
/// # Example
///
/// ```rust
/// use agentmesh::registry::RegistryConfig;
///
/// let config = RegistryConfig::new("nacos.internal:8848")
///     .with_namespace("agents")
///     .with_fetch_timeout(10);
/// assert_eq!(config.fetch_timeout_secs, 10);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry server address, `host:port`.
    pub server_addr: String,
    /// Optional namespace / tenant isolation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Optional username for registries with auth enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Optional password for registries with auth enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Timeout for the initial blocking fetch, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Timeout for transport connections, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new("127.0.0.1:8848")
    }
}

impl RegistryConfig {
    /// Create a config pointing at the given registry address.
    pub fn new(server_addr: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            namespace: None,
            username: None,
            password: None,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Builder: set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Builder: set credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Builder: set the initial-fetch timeout in seconds.
    pub fn with_fetch_timeout(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }

    /// Builder: set the transport connect timeout in seconds.
    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Load configuration from `AGENTMESH_REGISTRY_*` environment variables.
    ///
    /// Unset variables fall back to the defaults; a malformed timeout value
    /// is ignored rather than failing startup.
    pub fn from_env() -> Self {
        let mut config = match std::env::var("AGENTMESH_REGISTRY_ADDR") {
            Ok(addr) => Self::new(addr),
            Err(_) => Self::default(),
        };
        if let Ok(ns) = std::env::var("AGENTMESH_REGISTRY_NAMESPACE") {
            config.namespace = Some(ns);
        }
        if let (Ok(user), Ok(pass)) = (
            std::env::var("AGENTMESH_REGISTRY_USERNAME"),
            std::env::var("AGENTMESH_REGISTRY_PASSWORD"),
        ) {
            config.username = Some(user);
            config.password = Some(pass);
        }
        if let Ok(timeout) = std::env::var("AGENTMESH_REGISTRY_FETCH_TIMEOUT") {
            if let Ok(secs) = timeout.parse::<u64>() {
                config.fetch_timeout_secs = secs;
            }
        }
        config
    }
}
