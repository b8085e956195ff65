//! Transport shims between a [`DynamicMcpClient`] and an MCP server.
//!
//! A transport binds to one endpoint URL taken from a descriptor snapshot
//! and speaks JSON-RPC over it. Transports are cheap to build and are
//! replaced wholesale on refresh rather than re-pointed, so in-flight
//! requests keep the endpoint they started with.
//!
//! [`DynamicMcpClient`]: crate::mcp::client::DynamicMcpClient

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::mcp::descriptor::{McpServerDescriptor, MCP_PROTOCOL_SSE, MCP_PROTOCOL_STREAMABLE};
use crate::registry::RegistryError;

pub mod http;
pub mod sse;

pub use http::StreamableHttpTransport;
pub use sse::SseTransport;

/// Shared HTTP client for all transports.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// The wire flavor a transport speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    StreamableHttp,
    Sse,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::StreamableHttp => write!(f, "streamable-http"),
            TransportKind::Sse => write!(f, "sse"),
        }
    }
}

/// A connection to one MCP server endpoint.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// The wire flavor of this transport.
    fn kind(&self) -> TransportKind;

    /// Whether [`McpTransport::connect`] has succeeded.
    fn connected(&self) -> bool;

    /// Stable identifier of the endpoint this transport is bound to,
    /// `kind:url`. Two transports with the same identifier are
    /// interchangeable.
    fn server_identifier(&self) -> String;

    /// Validate the endpoint and mark the transport ready.
    ///
    /// Connection setup is lazy: no request is sent here, the first
    /// [`McpTransport::request`] establishes the actual exchange.
    async fn connect(&self) -> Result<(), RegistryError>;

    /// Mark the transport unusable. Idempotent.
    async fn disconnect(&self) -> Result<(), RegistryError>;

    /// Perform one JSON-RPC call against the endpoint.
    async fn request(&self, method: &str, params: Value) -> Result<Value, RegistryError>;
}

impl fmt::Debug for dyn McpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpTransport")
            .field("kind", &self.kind())
            .field("server_identifier", &self.server_identifier())
            .finish_non_exhaustive()
    }
}

/// Build the transport matching a descriptor's effective protocol and
/// preferred endpoint.
///
/// # Errors
///
/// * [`RegistryError::NotFound`] when the descriptor has no endpoint.
/// * [`RegistryError::InvalidParam`] for an unsupported protocol.
pub fn build_transport(
    descriptor: &McpServerDescriptor,
) -> Result<Arc<dyn McpTransport>, RegistryError> {
    let url = descriptor.endpoint_url()?;
    match descriptor.effective_protocol() {
        MCP_PROTOCOL_SSE => Ok(Arc::new(SseTransport::new(url))),
        MCP_PROTOCOL_STREAMABLE | "http" => Ok(Arc::new(StreamableHttpTransport::new(url))),
        other => Err(RegistryError::InvalidParam(format!(
            "unsupported mcp protocol '{}' for server '{}'",
            other, descriptor.name
        ))),
    }
}

/// Validate that a transport URL parses; called from `connect`.
pub(crate) fn validate_url(url: &str) -> Result<(), RegistryError> {
    reqwest::Url::parse(url)
        .map(|_| ())
        .map_err(|e| RegistryError::InvalidParam(format!("invalid endpoint url '{}': {}", url, e)))
}

/// One JSON-RPC exchange over HTTP POST, shared by both transports.
pub(crate) async fn post_json_rpc(
    url: &str,
    method: &str,
    params: Value,
) -> Result<Value, RegistryError> {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "id": uuid::Uuid::new_v4().to_string(),
        "method": method,
        "params": params,
    });
    log::debug!("mcp request '{}' -> {}", method, url);

    let resp = HTTP_CLIENT
        .post(url)
        .header("Content-Type", "application/json")
        .header("Accept", "application/json, text/event-stream")
        .json(&body)
        .send()
        .await
        .map_err(anyhow::Error::from)?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(RegistryError::Transport(anyhow::anyhow!(
            "mcp request '{}' to {} failed: HTTP {} - {}",
            method,
            url,
            status,
            body
        )));
    }

    let rpc_resp: Value = resp.json().await.map_err(anyhow::Error::from)?;
    if let Some(error) = rpc_resp.get("error") {
        return Err(RegistryError::Transport(anyhow::anyhow!(
            "mcp request '{}' returned error: {}",
            method,
            error
        )));
    }
    Ok(rpc_resp.get("result").cloned().unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::descriptor::McpEndpoint;

    fn descriptor(protocol: &str) -> McpServerDescriptor {
        let mut descriptor = McpServerDescriptor::new("maps", protocol);
        descriptor
            .backend_endpoints
            .push(McpEndpoint::new("10.0.0.2", 8000).with_path("mcp"));
        descriptor
    }

    #[test]
    fn test_build_transport_streamable() {
        let transport = build_transport(&descriptor(MCP_PROTOCOL_STREAMABLE)).unwrap();
        assert_eq!(transport.kind(), TransportKind::StreamableHttp);
        assert_eq!(
            transport.server_identifier(),
            "streamable-http:http://10.0.0.2:8000/mcp"
        );
    }

    #[test]
    fn test_build_transport_sse() {
        let transport = build_transport(&descriptor(MCP_PROTOCOL_SSE)).unwrap();
        assert_eq!(transport.kind(), TransportKind::Sse);
    }

    #[test]
    fn test_build_transport_honors_front_protocol() {
        let mut descriptor = descriptor(MCP_PROTOCOL_STREAMABLE);
        descriptor.front_protocol = Some(MCP_PROTOCOL_SSE.to_string());
        let transport = build_transport(&descriptor).unwrap();
        assert_eq!(transport.kind(), TransportKind::Sse);
    }

    #[test]
    fn test_build_transport_unknown_protocol() {
        assert!(matches!(
            build_transport(&descriptor("stdio")).unwrap_err(),
            RegistryError::InvalidParam(_)
        ));
    }

    #[test]
    fn test_build_transport_without_endpoint() {
        let descriptor = McpServerDescriptor::new("maps", MCP_PROTOCOL_SSE);
        assert!(matches!(
            build_transport(&descriptor).unwrap_err(),
            RegistryError::NotFound(_)
        ));
    }
}
