//! Streamable-HTTP transport.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::mcp::transports::{post_json_rpc, validate_url, McpTransport, TransportKind};
use crate::registry::RegistryError;

/// Transport posting JSON-RPC requests to a streamable-HTTP MCP endpoint.
pub struct StreamableHttpTransport {
    url: String,
    connected: AtomicBool,
}

impl StreamableHttpTransport {
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
impl McpTransport for StreamableHttpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::StreamableHttp
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn server_identifier(&self) -> String {
        format!("{}:{}", TransportKind::StreamableHttp, self.url)
    }

    async fn connect(&self) -> Result<(), RegistryError> {
        validate_url(&self.url)?;
        self.connected.store(true, Ordering::SeqCst);
        log::debug!("streamable-http transport ready for {}", self.url);
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
