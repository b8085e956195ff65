//! SSE transport.
//!
//! Requests are posted to the server's message endpoint; streamed
//! notifications on the event channel are not consumed here, descriptor
//! push events from the registry carry the state this crate reacts to.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::mcp::transports::{post_json_rpc, validate_url, McpTransport, TransportKind};
use crate::registry::RegistryError;

/// Transport for SSE-fronted MCP endpoints.
pub struct SseTransport {
    url: String,
    connected: AtomicBool,
}

impl SseTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connected: AtomicBool::new(false),
        }
    }

    /// The endpoint URL this transport posts to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl McpTransport for SseTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Sse
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn server_identifier(&self) -> String {
        format!("{}:{}", TransportKind::Sse, self.url)
    }

    async fn connect(&self) -> Result<(), RegistryError> {
        validate_url(&self.url)?;
        self.connected.store(true, Ordering::SeqCst);
        log::debug!("sse transport ready for {}", self.url);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), RegistryError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, RegistryError> {
        if !self.connected() {
            return Err(RegistryError::Transport(anyhow::anyhow!(
                "transport for {} is not connected",
                self.url
            )));
        }
        post_json_rpc(&self.url, method, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identifier_includes_kind_and_url() {
        let transport = SseTransport::new("http://10.0.0.2:8000/sse");
        assert_eq!(
            transport.server_identifier(),
            "sse:http://10.0.0.2:8000/sse"
        );
    }

    #[tokio::test]
    async fn test_connect_then_disconnect() {
        let transport = SseTransport::new("http://10.0.0.2:8000/sse");
        transport.connect().await.unwrap();
        assert!(transport.connected());
        transport.disconnect().await.unwrap();
        assert!(!transport.connected());
    }
}
