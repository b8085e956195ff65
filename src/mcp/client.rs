//! MCP client whose transport follows the registry.
//!
//! A [`DynamicMcpClient`] holds the current descriptor snapshot and the
//! transport built from it. When the registry pushes a new descriptor the
//! client rebuilds and connects a fresh transport, swaps it in, drains the
//! old one in the background, and notifies its post-refresh hooks. Callers
//! that snapshotted the old transport finish their request on it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::discovery::Refreshable;
use crate::mcp::descriptor::{McpServerDescriptor, McpToolSpec, McpToolSpecEntry};
use crate::mcp::manager::McpServerManager;
use crate::mcp::transports::{build_transport, McpTransport};
use crate::registry::RegistryError;

/// How long a replaced transport may stay open for in-flight requests.
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Callback invoked after the client finished applying a new descriptor.
///
/// Hooks rebuild whatever they derived from the previous snapshot, tool
/// views and toolkit registrations in this crate.
#[async_trait]
pub trait PostRefreshHook: Send + Sync {
    /// React to the freshly applied descriptor.
    async fn post_refresh(&self, descriptor: &McpServerDescriptor) -> Result<(), RegistryError>;

    /// Whether the hook's target is still alive. Dead hooks are pruned on
    /// the next refresh.
    fn is_live(&self) -> bool {
        true
    }
}

/// MCP client bound to one named server, refreshed by registry push.
pub struct DynamicMcpClient {
    name: String,
    id: Uuid,
    manager: McpServerManager,
    descriptor: RwLock<McpServerDescriptor>,
    transport: RwLock<Option<Arc<dyn McpTransport>>>,
    hooks: RwLock<Vec<Arc<dyn PostRefreshHook>>>,
    initialized: AtomicBool,
    drain_timeout: Duration,
    /// Back-reference to the owning `Arc`, for dependent registration.
    self_ref: Weak<Self>,
}

impl DynamicMcpClient {
    /// Wrap a descriptor snapshot. The client is inert until
    /// [`DynamicMcpClient::initialize`] is called.
    pub fn new(manager: McpServerManager, descriptor: McpServerDescriptor) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            name: descriptor.name.clone(),
            id: Uuid::new_v4(),
            manager,
            descriptor: RwLock::new(descriptor),
            transport: RwLock::new(None),
            hooks: RwLock::new(Vec::new()),
            initialized: AtomicBool::new(false),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            self_ref: self_ref.clone(),
        })
    }

    /// The server name this client follows.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The client's identity in the dependent registry.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The current descriptor snapshot.
    pub fn descriptor(&self) -> McpServerDescriptor {
        self.descriptor.read().clone()
    }

    /// Whether [`DynamicMcpClient::initialize`] has completed.
    pub fn initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Build and connect the initial transport and register for push
    /// refresh. Calling twice is a no-op.
    pub async fn initialize(&self) -> Result<(), RegistryError> {
        if self.initialized.load(Ordering::SeqCst) {
            return Ok(());
        }
        let descriptor = self.descriptor();
        let transport = build_transport(&descriptor)?;
        transport.connect().await?;
        log::info!(
            "mcp client for '{}' connected via {}",
            self.name,
            transport.server_identifier()
        );
        *self.transport.write() = Some(transport);
        self.initialized.store(true, Ordering::SeqCst);
        if let Some(this) = self.self_ref.upgrade() {
            let dependent: Arc<dyn Refreshable<McpServerDescriptor>> = this;
            self.manager.register_client(&self.name, dependent);
        }
        Ok(())
    }

    /// Install a hook to run after each applied refresh.
    pub fn register_refresh_hook(&self, hook: Arc<dyn PostRefreshHook>) {
        self.hooks.write().push(hook);
    }

    /// Tool specifications from the current descriptor snapshot.
    pub fn tool_specs(&self) -> Vec<McpToolSpecEntry> {
        self.descriptor.read().tool_spec.tools.clone()
    }

    /// Ask the server for its live tool list, overlaid with the registry's
    /// tool spec. The registry-side description and input schema win for
    /// tools present in both.
    pub async fn list_tools(&self) -> Result<Vec<McpToolSpecEntry>, RegistryError> {
        let result = self.request("tools/list", json!({})).await?;
        let listed: Vec<McpToolSpecEntry> = result
            .get("tools")
            .map(|tools| serde_json::from_value(tools.clone()))
            .transpose()
            .map_err(anyhow::Error::from)?
            .unwrap_or_default();
        let spec = self.descriptor.read().tool_spec.clone();
        Ok(Self::merge_tool_lists(listed, &spec))
    }

    /// Invoke one tool on the server.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: Value,
    ) -> Result<Value, RegistryError> {
        self.request(
            "tools/call",
            json!({ "name": tool_name, "arguments": arguments }),
        )
        .await
    }

    /// Deregister from push refresh, drop hooks, and close the transport.
    pub async fn close(&self) {
        self.manager.unregister_client(&self.name, self.id);
        self.hooks.write().clear();
        let transport = self.transport.write().take();
        if let Some(transport) = transport {
            if let Err(e) = transport.disconnect().await {
                log::warn!("failed to disconnect transport for '{}': {}", self.name, e);
            }
        }
        self.initialized.store(false, Ordering::SeqCst);
    }

    /// Perform one JSON-RPC exchange on a snapshot of the current
    /// transport. A refresh swapping the transport mid-call does not affect
    /// this request.
    async fn request(&self, method: &str, params: Value) -> Result<Value, RegistryError> {
        let transport = self
            .transport
            .read()
            .clone()
            .ok_or_else(|| {
                RegistryError::Transport(anyhow::anyhow!(
                    "mcp client for '{}' is not initialized",
                    self.name
                ))
            })?;
        transport.request(method, params).await
    }

    fn merge_tool_lists(
        listed: Vec<McpToolSpecEntry>,
        spec: &McpToolSpec,
    ) -> Vec<McpToolSpecEntry> {
        let mut merged = listed;
        for tool in &mut merged {
            if let Some(registry_tool) = spec.find(&tool.name) {
                if registry_tool.description.is_some() {
                    tool.description = registry_tool.description.clone();
                }
                if !registry_tool.input_schema.is_null() {
                    tool.input_schema = registry_tool.input_schema.clone();
                }
            }
        }
        // Registry-only tools are kept; the server may gate them behind
        // capability negotiation the shim does not perform.
        for registry_tool in &spec.tools {
            if !merged.iter().any(|tool| tool.name == registry_tool.name) {
                merged.push(registry_tool.clone());
            }
        }
        merged
    }

    /// Let the replaced transport finish in-flight requests, then close it.
    fn drain_and_close(old: Arc<dyn McpTransport>, name: String, drain_timeout: Duration) {
        tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + drain_timeout;
            while Arc::strong_count(&old) > 1 && tokio::time::Instant::now() < deadline {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            if let Err(e) = old.disconnect().await {
                log::warn!("failed to close drained transport for '{}': {}", name, e);
            } else {
                log::debug!("drained and closed old transport for '{}'", name);
            }
        });
    }

    async fn notify_hooks(&self, descriptor: &McpServerDescriptor) -> Result<(), RegistryError> {
        let snapshot: Vec<Arc<dyn PostRefreshHook>> = {
            let mut hooks = self.hooks.write();
            hooks.retain(|hook| hook.is_live());
            hooks.clone()
        };
        let mut first_error = None;
        for hook in snapshot {
            if let Err(e) = hook.post_refresh(descriptor).await {
                log::error!("post-refresh hook for '{}' failed: {}", self.name, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(RegistryError::refresh(&self.name, e)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Refreshable<McpServerDescriptor> for DynamicMcpClient {
    fn id(&self) -> Uuid {
        self.id
    }

    /// Apply a pushed descriptor: rebuild and connect a new transport,
    /// swap it in, drain the old one, update the snapshot, run the hooks.
    ///
    /// The new transport must connect before the swap; a broken push
    /// leaves the previous transport serving.
    async fn refresh(&self, descriptor: McpServerDescriptor) -> Result<(), RegistryError> {
        log::info!("refreshing mcp client for '{}'", self.name);
        let transport = build_transport(&descriptor)
            .map_err(|e| RegistryError::refresh(&self.name, e))?;
        transport
            .connect()
            .await
            .map_err(|e| RegistryError::refresh(&self.name, e))?;

        *self.descriptor.write() = descriptor.clone();
        let old = self.transport.write().replace(transport);
        if let Some(old) = old {
            Self::drain_and_close(old, self.name.clone(), self.drain_timeout);
        }

        self.notify_hooks(&descriptor).await
    }
}
