//! Push-refreshed cache of MCP server descriptors.

use std::sync::Arc;

use uuid::Uuid;

use crate::discovery::{DiscoveryManager, DiscoverySource, Refreshable};
use crate::mcp::client::DynamicMcpClient;
use crate::mcp::descriptor::McpServerDescriptor;
use crate::registry::{RegistryConfig, RegistryError};

/// Caches MCP server descriptors and keeps dependent clients current.
///
/// The first [`McpServerManager::get_server`] for a name fetches the
/// descriptor from the registry and subscribes for push updates; clients
/// registered for that name are refreshed whenever a new snapshot arrives.
#[derive(Clone)]
pub struct McpServerManager {
    manager: DiscoveryManager<McpServerDescriptor>,
}

impl McpServerManager {
    /// Create a manager over the given descriptor source.
    pub fn new(source: Arc<dyn DiscoverySource<Descriptor = McpServerDescriptor>>) -> Self {
        Self {
            manager: DiscoveryManager::new(source),
        }
    }

    /// Create a manager using the timeouts from a [`RegistryConfig`].
    pub fn with_config(
        source: Arc<dyn DiscoverySource<Descriptor = McpServerDescriptor>>,
        config: &RegistryConfig,
    ) -> Self {
        Self {
            manager: DiscoveryManager::with_config(source, config),
        }
    }

    /// Get the current descriptor for `server_name`, fetching and
    /// subscribing on first use.
    pub async fn get_server(
        &self,
        server_name: &str,
    ) -> Result<McpServerDescriptor, RegistryError> {
        self.manager.get(server_name).await
    }

    /// Build and initialize a [`DynamicMcpClient`] for `server_name`.
    ///
    /// The client is registered for push refresh before being returned.
    pub async fn client(
        &self,
        server_name: &str,
    ) -> Result<Arc<DynamicMcpClient>, RegistryError> {
        let descriptor = self.get_server(server_name).await?;
        let client = DynamicMcpClient::new(self.clone(), descriptor);
        client.initialize().await?;
        Ok(client)
    }

    /// Register a client (or any refreshable) for `server_name` updates.
    pub fn register_client(
        &self,
        server_name: &str,
        client: Arc<dyn Refreshable<McpServerDescriptor>>,
    ) {
        self.manager.register_dependent(server_name, client);
    }

    /// Remove a previously registered client by id.
    pub fn unregister_client(&self, server_name: &str, id: Uuid) {
        self.manager.remove_dependent(server_name, id);
    }

    /// Number of clients registered for `server_name`.
    pub fn client_count(&self, server_name: &str) -> usize {
        self.manager.dependent_count(server_name)
    }

    /// Unsubscribe from all watched servers and drop the cache.
    pub async fn close(&self) {
        self.manager.close().await;
    }
}
