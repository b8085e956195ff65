//! Callable tools derived from an MCP server's descriptor.
//!
//! Each [`DynamicMcpTool`] keeps a [`ToolView`] (description plus input
//! schema) derived from the client's current descriptor snapshot. After a
//! refresh the view is re-derived from scratch from the new snapshot, never
//! patched field by field, so stale attributes cannot survive an update.

use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::mcp::client::{DynamicMcpClient, PostRefreshHook};
use crate::mcp::descriptor::McpServerDescriptor;
use crate::registry::RegistryError;
use crate::toolkit::AgentTool;

/// The agent-facing projection of one tool spec.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolView {
    /// Human-readable tool description.
    pub description: String,
    /// JSON schema of the tool's input.
    pub parameters: Value,
}

/// Derive the view of `tool_name` from a descriptor snapshot.
///
/// # Errors
///
/// [`RegistryError::NotFound`] when the descriptor no longer lists the tool.
pub fn derive_tool_view(
    descriptor: &McpServerDescriptor,
    tool_name: &str,
) -> Result<ToolView, RegistryError> {
    let entry = descriptor.tool_spec.find(tool_name).ok_or_else(|| {
        RegistryError::NotFound(format!(
            "tool '{}' on server '{}'",
            tool_name, descriptor.name
        ))
    })?;
    let parameters = if entry.input_schema.is_null() {
        json!({ "type": "object" })
    } else {
        entry.input_schema.clone()
    };
    Ok(ToolView {
        description: entry.description.clone().unwrap_or_default(),
        parameters,
    })
}

/// A tool on a dynamically refreshed MCP server.
pub struct DynamicMcpTool {
    name: String,
    client: Arc<DynamicMcpClient>,
    view: parking_lot::RwLock<ToolView>,
}

impl DynamicMcpTool {
    /// Create the tool and hook it into the client's refresh cycle.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] when the client's current descriptor
    /// does not list `tool_name`.
    pub fn new(
        client: Arc<DynamicMcpClient>,
        tool_name: impl Into<String>,
    ) -> Result<Arc<Self>, RegistryError> {
        let name = tool_name.into();
        let view = derive_tool_view(&client.descriptor(), &name)?;
        let tool = Arc::new(Self {
            name,
            client,
            view: parking_lot::RwLock::new(view),
        });
        tool.client.register_refresh_hook(Arc::new(ViewRefresher {
            tool: Arc::downgrade(&tool),
        }));
        Ok(tool)
    }

    /// The current view snapshot.
    pub fn view(&self) -> ToolView {
        self.view.read().clone()
    }

    /// The client this tool calls through.
    pub fn client(&self) -> &Arc<DynamicMcpClient> {
        &self.client
    }
}

impl fmt::Debug for DynamicMcpTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicMcpTool")
            .field("name", &self.name)
            .field("view", &*self.view.read())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AgentTool for DynamicMcpTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        self.view.read().description.clone()
    }

    fn parameters(&self) -> Value {
        self.view.read().parameters.clone()
    }

    async fn call(&self, arguments: Value) -> Result<Value, RegistryError> {
        self.client.call_tool(&self.name, arguments).await
    }
}

/// Re-derives a tool's view after each client refresh.
struct ViewRefresher {
    tool: Weak<DynamicMcpTool>,
}

#[async_trait]
impl PostRefreshHook for ViewRefresher {
    async fn post_refresh(&self, descriptor: &McpServerDescriptor) -> Result<(), RegistryError> {
        let Some(tool) = self.tool.upgrade() else {
            return Ok(());
        };
        match derive_tool_view(descriptor, &tool.name) {
            Ok(view) => *tool.view.write() = view,
            // The tool vanished from the descriptor. Whoever owns the tool
            // decides its removal; until then the last view stays valid.
            Err(e) => log::warn!(
                "keeping last view for tool '{}' on '{}': {}",
                tool.name,
                descriptor.name,
                e
            ),
        }
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.tool.strong_count() > 0
    }
}

// ---------------------------------------------------------------------------
// McpToolBuilder
// ---------------------------------------------------------------------------

/// Builds [`DynamicMcpTool`]s for a client, with optional name filtering.
///
/// With both an include and an exclude list configured the include list
/// wins and the exclude list is ignored. With neither, every tool the
/// descriptor lists is built.
pub struct McpToolBuilder {
    client: Arc<DynamicMcpClient>,
    include: Vec<String>,
    exclude: Vec<String>,
}

impl McpToolBuilder {
    pub fn create(client: Arc<DynamicMcpClient>) -> Self {
        Self {
            client,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Builder: only build the named tools.
    pub fn include_tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = names.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: build everything except the named tools.
    pub fn exclude_tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    /// Build the selected tools from the client's current descriptor.
    pub fn build(self) -> Result<Vec<Arc<DynamicMcpTool>>, RegistryError> {
        if !self.include.is_empty() && !self.exclude.is_empty() {
            log::warn!(
                "both include and exclude lists set for '{}', using include only",
                self.client.name()
            );
        }
        let include = &self.include;

        let specs = self.client.tool_specs();
        for wanted in include {
            if !specs.iter().any(|spec| &spec.name == wanted) {
                log::warn!(
                    "included tool '{}' not found on server '{}'",
                    wanted,
                    self.client.name()
                );
            }
        }

        let mut tools = Vec::new();
        for spec in specs {
            let selected = if !include.is_empty() {
                include.contains(&spec.name)
            } else {
                !self.exclude.contains(&spec.name)
            };
            if selected {
                tools.push(DynamicMcpTool::new(Arc::clone(&self.client), spec.name)?);
            }
        }
        Ok(tools)
    }
}
