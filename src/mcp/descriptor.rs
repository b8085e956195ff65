//! MCP server descriptor model.
//!
//! A descriptor is the registry's immutable snapshot of one named MCP
//! server: its endpoints, protocol, and tool specifications. Push events
//! replace the whole descriptor; consumers re-derive any transformed view
//! from scratch rather than patching fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::RegistryError;

/// Protocol label for SSE-fronted MCP servers.
pub const MCP_PROTOCOL_SSE: &str = "sse";
/// Protocol label for streamable-HTTP MCP servers.
pub const MCP_PROTOCOL_STREAMABLE: &str = "streamable-http";

/// One network endpoint of an MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpEndpoint {
    /// URL scheme; blank defaults to `http`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Host address.
    pub address: String,
    /// Port.
    pub port: u16,
    /// Request path, with or without a leading slash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl McpEndpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            protocol: None,
            address: address.into(),
            port,
            path: None,
        }
    }

    /// Builder: set the request path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Render the endpoint as a URL, `scheme://address:port/path`.
    pub fn url(&self) -> String {
        let scheme = match self.protocol.as_deref() {
            Some(protocol) if !protocol.trim().is_empty() => protocol,
            _ => "http",
        };
        let path = match self.path.as_deref() {
            Some(path) if !path.trim().is_empty() => {
                if path.starts_with('/') {
                    path.to_string()
                } else {
                    format!("/{}", path)
                }
            }
            _ => String::new(),
        };
        format!("{}://{}:{}{}", scheme, self.address, self.port, path)
    }
}

/// Registry-side specification of one tool on an MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolSpecEntry {
    /// Tool name, unique within the server.
    pub name: String,
    /// Tool description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema of the tool's input.
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

impl McpToolSpecEntry {
    pub fn new(name: impl Into<String>, description: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            input_schema: schema,
        }
    }
}

/// The tool specifications advertised for a server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpToolSpec {
    #[serde(default)]
    pub tools: Vec<McpToolSpecEntry>,
}

impl McpToolSpec {
    /// Find a tool spec by name.
    pub fn find(&self, tool_name: &str) -> Option<&McpToolSpecEntry> {
        self.tools.iter().find(|tool| tool.name == tool_name)
    }
}

/// Immutable snapshot of one MCP server as registered in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerDescriptor {
    /// Server name (unique within the registry).
    pub name: String,
    /// Backend protocol label.
    pub protocol: String,
    /// Protocol exposed to consumers; overrides `protocol` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front_protocol: Option<String>,
    /// Endpoints exposed to consumers (a gateway, usually).
    #[serde(default)]
    pub frontend_endpoints: Vec<McpEndpoint>,
    /// Direct backend endpoints.
    #[serde(default)]
    pub backend_endpoints: Vec<McpEndpoint>,
    /// Tool specifications.
    #[serde(default)]
    pub tool_spec: McpToolSpec,
    /// Server description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Server version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl McpServerDescriptor {
    /// Minimal descriptor with a name and protocol.
    pub fn new(name: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            protocol: protocol.into(),
            front_protocol: None,
            frontend_endpoints: Vec::new(),
            backend_endpoints: Vec::new(),
            tool_spec: McpToolSpec::default(),
            description: None,
            version: None,
        }
    }

    /// The protocol consumers should speak: the front protocol when set
    /// and non-blank, the backend protocol otherwise.
    pub fn effective_protocol(&self) -> &str {
        match self.front_protocol.as_deref() {
            Some(front) if !front.trim().is_empty() => front,
            _ => &self.protocol,
        }
    }

    /// Choose the URL to connect to: frontend endpoints take precedence,
    /// the first available entry is used.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] when the descriptor carries no endpoint.
    pub fn endpoint_url(&self) -> Result<String, RegistryError> {
        let endpoints = if !self.frontend_endpoints.is_empty() {
            &self.frontend_endpoints
        } else {
            &self.backend_endpoints
        };
        endpoints
            .first()
            .map(McpEndpoint::url)
            .ok_or_else(|| {
                RegistryError::NotFound(format!("no endpoint found for server '{}'", self.name))
            })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn descriptor_with_endpoints() -> McpServerDescriptor {
        let mut descriptor = McpServerDescriptor::new("maps", MCP_PROTOCOL_STREAMABLE);
        descriptor
            .backend_endpoints
            .push(McpEndpoint::new("10.0.0.2", 8000).with_path("mcp"));
        descriptor
    }

    #[test]
    fn test_endpoint_url_formatting() {
        let endpoint = McpEndpoint::new("10.0.0.2", 8000).with_path("mcp");
        assert_eq!(endpoint.url(), "http://10.0.0.2:8000/mcp");

        let endpoint = McpEndpoint::new("10.0.0.2", 8000).with_path("/mcp");
        assert_eq!(endpoint.url(), "http://10.0.0.2:8000/mcp");

        let mut endpoint = McpEndpoint::new("10.0.0.2", 8443);
        endpoint.protocol = Some("https".to_string());
        assert_eq!(endpoint.url(), "https://10.0.0.2:8443");
    }

    #[test]
    fn test_frontend_endpoints_preferred() {
        let mut descriptor = descriptor_with_endpoints();
        descriptor
            .frontend_endpoints
            .push(McpEndpoint::new("gateway", 443).with_path("mcp"));
        assert_eq!(descriptor.endpoint_url().unwrap(), "http://gateway:443/mcp");
    }

    #[test]
    fn test_backend_endpoints_fallback() {
        let descriptor = descriptor_with_endpoints();
        assert_eq!(descriptor.endpoint_url().unwrap(), "http://10.0.0.2:8000/mcp");
    }

    #[test]
    fn test_no_endpoint_is_not_found() {
        let descriptor = McpServerDescriptor::new("maps", MCP_PROTOCOL_SSE);
        assert!(matches!(
            descriptor.endpoint_url().unwrap_err(),
            RegistryError::NotFound(_)
        ));
    }

    #[test]
    fn test_effective_protocol_prefers_front() {
        let mut descriptor = McpServerDescriptor::new("maps", MCP_PROTOCOL_STREAMABLE);
        assert_eq!(descriptor.effective_protocol(), MCP_PROTOCOL_STREAMABLE);

        descriptor.front_protocol = Some(MCP_PROTOCOL_SSE.to_string());
        assert_eq!(descriptor.effective_protocol(), MCP_PROTOCOL_SSE);

        descriptor.front_protocol = Some("  ".to_string());
        assert_eq!(descriptor.effective_protocol(), MCP_PROTOCOL_STREAMABLE);
    }

    #[test]
    fn test_tool_spec_find() {
        let mut descriptor = McpServerDescriptor::new("maps", MCP_PROTOCOL_SSE);
        descriptor.tool_spec.tools.push(McpToolSpecEntry::new(
            "geocode",
            "Resolve an address",
            json!({"type": "object"}),
        ));
        assert!(descriptor.tool_spec.find("geocode").is_some());
        assert!(descriptor.tool_spec.find("route").is_none());
    }

    #[test]
    fn test_descriptor_serde_input_schema_rename() {
        let json = json!({
            "name": "maps",
            "protocol": "sse",
            "tool_spec": {
                "tools": [ { "name": "geocode", "inputSchema": {"type": "object"} } ]
            },
        });
        let descriptor: McpServerDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(
            descriptor.tool_spec.tools[0].input_schema,
            json!({"type": "object"})
        );
    }
}
