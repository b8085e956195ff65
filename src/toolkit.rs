//! Tool registry for agents, with MCP-backed tools that follow the
//! registry.
//!
//! A [`Toolkit`] holds every tool an agent can call, keyed by name and
//! optionally grouped. Registering an MCP client installs its tools and a
//! refresher hook: when the server's descriptor changes, the old tool set
//! is dropped and rebuilt from the new snapshot with the same
//! include/exclude settings, so the agent always sees the current tools.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::mcp::client::{DynamicMcpClient, PostRefreshHook};
use crate::mcp::descriptor::McpServerDescriptor;
use crate::mcp::tool::McpToolBuilder;
use crate::registry::RegistryError;

/// A tool callable by an agent.
#[async_trait]
pub trait AgentTool: Send + Sync {
    /// Tool name, unique within a toolkit.
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> String;

    /// JSON schema of the tool's input.
    fn parameters(&self) -> Value;

    /// Invoke the tool.
    async fn call(&self, arguments: Value) -> Result<Value, RegistryError>;
}

struct RegisteredTool {
    tool: Arc<dyn AgentTool>,
    group: Option<String>,
}

/// Per-client settings remembered for rebuilds.
struct McpClientInfo {
    group: Option<String>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    tool_names: Vec<String>,
}

/// Named collection of agent tools.
pub struct Toolkit {
    tools: DashMap<String, RegisteredTool>,
    client_infos: DashMap<String, McpClientInfo>,
    /// Back-reference to the owning `Arc`, handed to refresher hooks.
    self_ref: Weak<Toolkit>,
}

impl Toolkit {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            tools: DashMap::new(),
            client_infos: DashMap::new(),
            self_ref: self_ref.clone(),
        })
    }

    /// Register a tool under an optional group. An existing tool with the
    /// same name is replaced.
    pub fn register_tool(&self, tool: Arc<dyn AgentTool>, group: Option<String>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), RegisteredTool { tool, group }).is_some() {
            log::debug!("tool '{}' replaced in toolkit", name);
        }
    }

    /// Remove a tool by name. Unknown names are ignored.
    pub fn remove_tool(&self, name: &str) {
        self.tools.remove(name);
    }

    /// Look up a tool by name.
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn AgentTool>> {
        self.tools.get(name).map(|entry| Arc::clone(&entry.tool))
    }

    /// Names of all registered tools, in no particular order.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Names of the tools registered under `group`.
    pub fn tools_in_group(&self, group: &str) -> Vec<String> {
        self.tools
            .iter()
            .filter(|entry| entry.value().group.as_deref() == Some(group))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Register every selected tool of an MCP client and keep the set
    /// current across descriptor refreshes.
    ///
    /// `include` and `exclude` filter by tool name; with both set the
    /// include list wins. The same filters are re-applied on every rebuild.
    pub fn register_mcp_client(
        &self,
        client: Arc<DynamicMcpClient>,
        include: Option<Vec<String>>,
        exclude: Option<Vec<String>>,
        group: Option<String>,
    ) -> Result<(), RegistryError> {
        let server_name = client.name().to_string();
        let tool_names = self.install_client_tools(&client, &include, &exclude, &group)?;
        log::info!(
            "registered {} tool(s) from mcp server '{}'",
            tool_names.len(),
            server_name
        );
        self.client_infos.insert(
            server_name.clone(),
            McpClientInfo {
                group,
                include,
                exclude,
                tool_names,
            },
        );
        client.register_refresh_hook(Arc::new(ToolsRefresher {
            toolkit: self.self_ref.clone(),
            client: Arc::downgrade(&client),
            server_name,
        }));
        Ok(())
    }

    /// Drop an MCP client's tools and forget its settings. The refresher
    /// hook left on the client goes inert and is pruned on its next
    /// refresh.
    pub fn remove_mcp_client(&self, server_name: &str) {
        if let Some((_, info)) = self.client_infos.remove(server_name) {
            for name in info.tool_names {
                self.tools.remove(&name);
            }
        }
    }

    fn install_client_tools(
        &self,
        client: &Arc<DynamicMcpClient>,
        include: &Option<Vec<String>>,
        exclude: &Option<Vec<String>>,
        group: &Option<String>,
    ) -> Result<Vec<String>, RegistryError> {
        let mut builder = McpToolBuilder::create(Arc::clone(client));
        if let Some(include) = include {
            builder = builder.include_tools(include.iter().cloned());
        }
        if let Some(exclude) = exclude {
            builder = builder.exclude_tools(exclude.iter().cloned());
        }
        let tools = builder.build()?;
        let mut names = Vec::with_capacity(tools.len());
        for tool in tools {
            names.push(tool.name().to_string());
            self.register_tool(tool, group.clone());
        }
        Ok(names)
    }
}

/// Rebuilds a client's toolkit entries after each descriptor refresh.
struct ToolsRefresher {
    toolkit: Weak<Toolkit>,
    client: Weak<DynamicMcpClient>,
    server_name: String,
}

#[async_trait]
impl PostRefreshHook for ToolsRefresher {
    async fn post_refresh(&self, _descriptor: &McpServerDescriptor) -> Result<(), RegistryError> {
        let (Some(toolkit), Some(client)) = (self.toolkit.upgrade(), self.client.upgrade()) else {
            return Ok(());
        };
        // The client may have been removed from the toolkit since.
        let Some(mut info) = toolkit.client_infos.get_mut(&self.server_name) else {
            return Ok(());
        };
        for name in info.tool_names.drain(..) {
            toolkit.tools.remove(&name);
        }
        let names = toolkit.install_client_tools(
            &client,
            &info.include,
            &info.exclude,
            &info.group,
        )?;
        log::info!(
            "rebuilt {} tool(s) from mcp server '{}'",
            names.len(),
            self.server_name
        );
        info.tool_names = names;
        Ok(())
    }

    fn is_live(&self) -> bool {
        match self.toolkit.upgrade() {
            Some(toolkit) => toolkit.client_infos.contains_key(&self.server_name),
            None => false,
        }
    }
}
