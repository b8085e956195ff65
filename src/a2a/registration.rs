//! Publishing an agent's card and endpoints to the registry.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::a2a::card::{AgentCard, AgentEndpoint};
use crate::registry::RegistryError;

/// Write side of the card registry.
///
/// Implementations wrap a real registry SDK; release and endpoint
/// registration are separate operations because a card version can be
/// released once while endpoint instances come and go.
#[async_trait]
pub trait CardRegistry: Send + Sync {
    /// Fetch an already-released card, `None` when absent.
    async fn get_card(
        &self,
        agent_name: &str,
        version: Option<&str>,
    ) -> Result<Option<AgentCard>, RegistryError>;

    /// Release (publish) a card version to the registry.
    async fn release_card(
        &self,
        card: &AgentCard,
        set_as_latest: bool,
    ) -> Result<(), RegistryError>;

    /// Register callable endpoints for a released card.
    async fn register_endpoints(
        &self,
        agent_name: &str,
        endpoints: &[AgentEndpoint],
    ) -> Result<(), RegistryError>;
}

/// Settings controlling one registration pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct A2aRegistrationProperties {
    /// Whether to register endpoints after releasing the card.
    pub register_endpoint: bool,
    /// Whether the released card version becomes the latest.
    pub set_as_latest: bool,
    /// Endpoints to register for this instance.
    pub endpoints: Vec<AgentEndpoint>,
}

impl Default for A2aRegistrationProperties {
    fn default() -> Self {
        Self {
            register_endpoint: true,
            set_as_latest: true,
            endpoints: Vec::new(),
        }
    }
}

impl A2aRegistrationProperties {
    /// Builder: add an endpoint.
    pub fn with_endpoint(mut self, endpoint: AgentEndpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Builder: disable endpoint registration.
    pub fn without_endpoints(mut self) -> Self {
        self.register_endpoint = false;
        self
    }

    /// Builder: release without marking the version as latest.
    pub fn without_latest(mut self) -> Self {
        self.set_as_latest = false;
        self
    }
}

/// Registers an agent card plus its endpoints with the registry.
pub struct A2aRegistration {
    registry: Arc<dyn CardRegistry>,
}

impl A2aRegistration {
    pub fn new(registry: Arc<dyn CardRegistry>) -> Self {
        Self { registry }
    }

    /// Release `card` to the registry and register this instance's
    /// endpoints.
    ///
    /// A card that already exists for the same name/version is logged as a
    /// warning; the release call may be ignored registry-side. Endpoint
    /// registration is skipped when disabled or when no endpoints are
    /// configured; each endpoint is stamped with the card's version.
    pub async fn register_agent(
        &self,
        card: &AgentCard,
        properties: &A2aRegistrationProperties,
    ) -> Result<(), RegistryError> {
        self.try_release_card(card, properties).await?;
        self.register_endpoints(card, properties).await
    }

    async fn try_release_card(
        &self,
        card: &AgentCard,
        properties: &A2aRegistrationProperties,
    ) -> Result<(), RegistryError> {
        if let Ok(Some(_)) = self
            .registry
            .get_card(&card.name, card.version.as_deref())
            .await
        {
            log::warn!(
                "agent card '{}' already exists, card release might be ignored",
                card.name
            );
        }
        log::info!("releasing agent card '{}' to registry", card.name);
        self.registry
            .release_card(card, properties.set_as_latest)
            .await?;
        log::info!("agent card '{}' released successfully", card.name);
        Ok(())
    }

    async fn register_endpoints(
        &self,
        card: &AgentCard,
        properties: &A2aRegistrationProperties,
    ) -> Result<(), RegistryError> {
        if !properties.register_endpoint {
            log::info!("endpoint registration disabled, skipping");
            return Ok(());
        }
        if properties.endpoints.is_empty() {
            log::warn!("no endpoints configured, skipping endpoint registration");
            return Ok(());
        }
        log::info!(
            "registering {} endpoint(s) for agent '{}'",
            properties.endpoints.len(),
            card.name
        );
        let endpoints: Vec<AgentEndpoint> = properties
            .endpoints
            .iter()
            .cloned()
            .map(|mut endpoint| {
                endpoint.version = card.version.clone();
                endpoint
            })
            .collect();
        self.registry.register_endpoints(&card.name, &endpoints).await
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingRegistry {
        existing: Mutex<Option<AgentCard>>,
        released: Mutex<Vec<(AgentCard, bool)>>,
        endpoints: Mutex<Vec<(String, Vec<AgentEndpoint>)>>,
    }

    #[async_trait]
    impl CardRegistry for RecordingRegistry {
        async fn get_card(
            &self,
            _agent_name: &str,
            _version: Option<&str>,
        ) -> Result<Option<AgentCard>, RegistryError> {
            Ok(self.existing.lock().clone())
        }

        async fn release_card(
            &self,
            card: &AgentCard,
            set_as_latest: bool,
        ) -> Result<(), RegistryError> {
            self.released.lock().push((card.clone(), set_as_latest));
            Ok(())
        }

        async fn register_endpoints(
            &self,
            agent_name: &str,
            endpoints: &[AgentEndpoint],
        ) -> Result<(), RegistryError> {
            self.endpoints
                .lock()
                .push((agent_name.to_string(), endpoints.to_vec()));
            Ok(())
        }
    }

    fn versioned_card() -> AgentCard {
        let mut card = AgentCard::new("translator", "http://t:80");
        card.version = Some("1.2.0".to_string());
        card
    }

    #[tokio::test]
    async fn test_register_releases_card_and_endpoints() {
        let registry = Arc::new(RecordingRegistry::default());
        let registration = A2aRegistration::new(registry.clone());
        let properties = A2aRegistrationProperties::default()
            .with_endpoint(AgentEndpoint::new("JSONRPC", "10.0.0.1", 8080));

        registration
            .register_agent(&versioned_card(), &properties)
            .await
            .unwrap();

        let released = registry.released.lock();
        assert_eq!(released.len(), 1);
        assert!(released[0].1);

        let endpoints = registry.endpoints.lock();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].0, "translator");
        // Endpoints are stamped with the card version.
        assert_eq!(endpoints[0].1[0].version.as_deref(), Some("1.2.0"));
    }

    #[tokio::test]
    async fn test_register_skips_endpoints_when_disabled() {
        let registry = Arc::new(RecordingRegistry::default());
        let registration = A2aRegistration::new(registry.clone());
        let properties = A2aRegistrationProperties::default()
            .with_endpoint(AgentEndpoint::new("JSONRPC", "10.0.0.1", 8080))
            .without_endpoints();

        registration
            .register_agent(&versioned_card(), &properties)
            .await
            .unwrap();
        assert_eq!(registry.released.lock().len(), 1);
        assert!(registry.endpoints.lock().is_empty());
    }

    #[tokio::test]
    async fn test_register_skips_when_no_endpoints_configured() {
        let registry = Arc::new(RecordingRegistry::default());
        let registration = A2aRegistration::new(registry.clone());

        registration
            .register_agent(&versioned_card(), &A2aRegistrationProperties::default())
            .await
            .unwrap();
        assert!(registry.endpoints.lock().is_empty());
    }

    #[tokio::test]
    async fn test_register_with_existing_card_still_releases() {
        let registry = Arc::new(RecordingRegistry::default());
        *registry.existing.lock() = Some(versioned_card());
        let registration = A2aRegistration::new(registry.clone());

        registration
            .register_agent(&versioned_card(), &A2aRegistrationProperties::default())
            .await
            .unwrap();
        assert_eq!(registry.released.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_without_latest_flag_propagates() {
        let registry = Arc::new(RecordingRegistry::default());
        let registration = A2aRegistration::new(registry.clone());
        let properties = A2aRegistrationProperties::default().without_latest();

        registration
            .register_agent(&versioned_card(), &properties)
            .await
            .unwrap();
        assert!(!registry.released.lock()[0].1);
    }
}
