//! Agent card model.
//!
//! An agent card is the descriptor snapshot for a named A2A agent. Cards
//! are replaced wholesale when the registry pushes an update; no field is
//! ever mutated in place.

use serde::{Deserialize, Serialize};

use crate::registry::RegistryError;

/// Describes one skill/capability a remote agent offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSkill {
    /// Unique identifier for the skill.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Description of what the skill does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Input modes supported (e.g., "text", "image").
    #[serde(default)]
    pub input_modes: Vec<String>,
    /// Output modes supported.
    #[serde(default)]
    pub output_modes: Vec<String>,
    /// Tags for categorization.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Capabilities advertised by a remote agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentCapabilities {
    /// Whether the agent supports streaming responses.
    #[serde(default)]
    pub streaming: bool,
    /// Whether the agent supports push notifications.
    #[serde(default)]
    pub push_notifications: bool,
    /// Whether the agent supports multi-turn conversations.
    #[serde(default)]
    pub multi_turn: bool,
}

/// Provider information for a remote agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProvider {
    /// Name of the provider organization.
    pub organization: String,
    /// Contact URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One callable endpoint of an agent as registered in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEndpoint {
    /// Transport label (e.g., "JSONRPC").
    pub transport: String,
    /// Host address.
    pub address: String,
    /// Port.
    pub port: u16,
    /// Request path, with or without a leading slash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// URL scheme; defaults to `http`/`https` based on `support_tls`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Whether the endpoint serves TLS.
    #[serde(default)]
    pub support_tls: bool,
    /// Card version this endpoint belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Query string appended to the URL, without the leading `?`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl AgentEndpoint {
    /// Create an endpoint with just transport, address, and port.
    pub fn new(transport: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            transport: transport.into(),
            address: address.into(),
            port,
            path: None,
            protocol: None,
            support_tls: false,
            version: None,
            query: None,
        }
    }

    /// Render the endpoint as a full URL, `scheme://address:port/path?query`.
    pub fn url(&self) -> String {
        let scheme = match self.protocol.as_deref() {
            Some(protocol) if !protocol.trim().is_empty() => protocol,
            _ if self.support_tls => "https",
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
        let query = match self.query.as_deref() {
            Some(query) if !query.is_empty() => format!("?{}", query),
            _ => String::new(),
        };
        format!("{}://{}:{}{}{}", scheme, self.address, self.port, path, query)
    }
}

/// Agent card: the full descriptor of a named remote agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCard {
    /// Agent name (unique within the registry).
    pub name: String,
    /// Agent description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Canonical agent URL; may be empty when endpoints carry the address.
    #[serde(default)]
    pub url: String,
    /// Card version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Advertised capabilities.
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    /// Advertised skills.
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
    /// Provider organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<AgentProvider>,
    /// Registry-side endpoints for the agent.
    #[serde(default)]
    pub endpoints: Vec<AgentEndpoint>,
    /// Default input modes.
    #[serde(default)]
    pub default_input_modes: Vec<String>,
    /// Default output modes.
    #[serde(default)]
    pub default_output_modes: Vec<String>,
}

impl AgentCard {
    /// Minimal card with a name and canonical URL.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            url: url.into(),
            version: None,
            capabilities: AgentCapabilities::default(),
            skills: Vec::new(),
            provider: None,
            endpoints: Vec::new(),
            default_input_modes: Vec::new(),
            default_output_modes: Vec::new(),
        }
    }

    /// Resolve the URL to call this agent at.
    ///
    /// Registry endpoints take precedence over the canonical URL; among
    /// endpoints the first available one is chosen; no load-balancing or
    /// health-check policy is applied here.
    pub fn preferred_url(&self) -> Result<String, RegistryError> {
        if let Some(endpoint) = self.endpoints.first() {
            return Ok(endpoint.url());
        }
        if !self.url.trim().is_empty() {
            return Ok(self.url.clone());
        }
        Err(RegistryError::NotFound(format!(
            "no endpoint found for agent '{}'",
            self.name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_defaults_to_http() {
        let endpoint = AgentEndpoint::new("JSONRPC", "10.0.0.1", 8080);
        assert_eq!(endpoint.url(), "http://10.0.0.1:8080");
    }

    #[test]
    fn test_endpoint_url_tls_and_path_normalization() {
        let mut endpoint = AgentEndpoint::new("JSONRPC", "agent.internal", 443);
        endpoint.support_tls = true;
        endpoint.path = Some("a2a".to_string());
        assert_eq!(endpoint.url(), "https://agent.internal:443/a2a");

        endpoint.path = Some("/a2a".to_string());
        assert_eq!(endpoint.url(), "https://agent.internal:443/a2a");
    }

    #[test]
    fn test_endpoint_url_explicit_protocol_and_query() {
        let mut endpoint = AgentEndpoint::new("JSONRPC", "h", 9000);
        endpoint.protocol = Some("https".to_string());
        endpoint.query = Some("version=2".to_string());
        assert_eq!(endpoint.url(), "https://h:9000?version=2");
    }

    #[test]
    fn test_preferred_url_prefers_endpoints() {
        let mut card = AgentCard::new("translator", "http://fallback:80");
        card.endpoints.push(AgentEndpoint::new("JSONRPC", "ep1", 8080));
        card.endpoints.push(AgentEndpoint::new("JSONRPC", "ep2", 8081));
        assert_eq!(card.preferred_url().unwrap(), "http://ep1:8080");
    }

    #[test]
    fn test_preferred_url_falls_back_to_card_url() {
        let card = AgentCard::new("translator", "http://fallback:80");
        assert_eq!(card.preferred_url().unwrap(), "http://fallback:80");
    }

    #[test]
    fn test_preferred_url_errors_when_nothing_available() {
        let card = AgentCard::new("translator", "");
        assert!(matches!(
            card.preferred_url().unwrap_err(),
            RegistryError::NotFound(_)
        ));
    }

    #[test]
    fn test_card_deserializes_with_defaults() {
        let card: AgentCard = serde_json::from_str(r#"{"name": "translator"}"#).unwrap();
        assert_eq!(card.name, "translator");
        assert!(card.url.is_empty());
        assert!(card.skills.is_empty());
        assert!(!card.capabilities.streaming);
    }
}
