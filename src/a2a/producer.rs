//! Card producers: resolve an agent name to its current card.
//!
//! Three strategies exist, matching how deployments actually discover
//! agents: a fixed card handed in at configuration time, the well-known
//! HTTP endpoint on the agent itself, and the registry-backed producer
//! that caches cards and keeps them current via push notifications.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::a2a::card::AgentCard;
use crate::discovery::{DiscoveryManager, DiscoverySource};
use crate::registry::{RegistryConfig, RegistryError};

/// Resolves an agent name to its current [`AgentCard`].
#[async_trait]
pub trait CardProducer: Send + Sync {
    async fn produce(&self, agent_name: &str) -> Result<AgentCard, RegistryError>;
}

// ---------------------------------------------------------------------------
// FixedCardProducer
// ---------------------------------------------------------------------------

/// Produces a card fixed at construction time.
///
/// Useful for statically configured peers; requests for any other agent
/// name fail with [`RegistryError::NotFound`].
pub struct FixedCardProducer {
    card: AgentCard,
}

impl FixedCardProducer {
    pub fn new(card: AgentCard) -> Self {
        Self { card }
    }
}

#[async_trait]
impl CardProducer for FixedCardProducer {
    async fn produce(&self, agent_name: &str) -> Result<AgentCard, RegistryError> {
        if agent_name != self.card.name {
            return Err(RegistryError::NotFound(agent_name.to_string()));
        }
        Ok(self.card.clone())
    }
}

// ---------------------------------------------------------------------------
// WellKnownCardProducer
// ---------------------------------------------------------------------------

/// Fetches the card from the agent's own `/.well-known/agent.json`.
///
/// No caching and no push refresh: every call performs an HTTP GET, so the
/// returned card is only as fresh as the moment of the request.
pub struct WellKnownCardProducer {
    base_url: String,
    timeout: Duration,
}

impl WellKnownCardProducer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Builder: set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl CardProducer for WellKnownCardProducer {
    async fn produce(&self, agent_name: &str) -> Result<AgentCard, RegistryError> {
        let url = format!(
            "{}/.well-known/agent.json",
            self.base_url.trim_end_matches('/')
        );
        log::debug!("fetching agent card for '{}' from {}", agent_name, url);

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(anyhow::Error::from)?;
        let resp = client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(anyhow::Error::from)?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(agent_name.to_string()));
        }
        if !resp.status().is_success() {
            return Err(RegistryError::Transport(anyhow::anyhow!(
                "failed to fetch agent card from {}: HTTP {}",
                url,
                resp.status()
            )));
        }
        let card: AgentCard = resp.json().await.map_err(anyhow::Error::from)?;
        Ok(card)
    }
}

// ---------------------------------------------------------------------------
// RegistryCardProducer
// ---------------------------------------------------------------------------

/// Registry-backed card producer with a push-refreshed cache.
///
/// The first `produce` for an agent name subscribes to the registry and
/// caches the returned card; subsequent calls are served from the cache,
/// which registry push notifications overwrite as the agent's card changes.
pub struct RegistryCardProducer {
    manager: DiscoveryManager<AgentCard>,
}

impl RegistryCardProducer {
    /// Create a producer over the given card source.
    pub fn new(source: Arc<dyn DiscoverySource<Descriptor = AgentCard>>) -> Self {
        Self {
            manager: DiscoveryManager::new(source),
        }
    }

    /// Create a producer using the timeouts from a [`RegistryConfig`].
    pub fn with_config(
        source: Arc<dyn DiscoverySource<Descriptor = AgentCard>>,
        config: &RegistryConfig,
    ) -> Self {
        Self {
            manager: DiscoveryManager::with_config(source, config),
        }
    }

    /// The underlying discovery manager.
    pub fn manager(&self) -> &DiscoveryManager<AgentCard> {
        &self.manager
    }

    /// Unsubscribe from all watched agents and drop the cache.
    pub async fn close(&self) {
        self.manager.close().await;
    }
}

#[async_trait]
impl CardProducer for RegistryCardProducer {
    async fn produce(&self, agent_name: &str) -> Result<AgentCard, RegistryError> {
        self.manager.get(agent_name).await
    }
}
