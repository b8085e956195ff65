//! Minimal JSON-RPC client for delegating to a remote A2A agent.
//!
//! Only the `message/send` call is implemented here; streaming and update
//! negotiation belong to the full protocol stack, which this crate does
//! not reimplement.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::a2a::card::AgentCard;
use crate::registry::RegistryError;

/// One part of an A2A message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePart {
    /// Text content of the part.
    pub text: String,
}

/// A message exchanged with a remote agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the sender ("user" or "agent").
    pub role: String,
    /// Message parts.
    pub parts: Vec<MessagePart>,
}

impl Message {
    /// A single-part user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![MessagePart { text: text.into() }],
        }
    }
}

/// Outcome of a `message/send` call.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Whether the remote task completed.
    pub success: bool,
    /// Result text extracted from the first artifact, if any.
    pub output: Option<String>,
    /// Error description when the task failed.
    pub error: Option<String>,
}

/// Client bound to one remote agent endpoint.
pub struct A2aClient {
    /// Endpoint URL the client posts to.
    pub endpoint: String,
    /// HTTP timeout in seconds.
    pub timeout: u64,
}

impl A2aClient {
    /// Create a client for an explicit endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: 30,
        }
    }

    /// Create a client from an agent card, using its preferred endpoint.
    pub fn from_card(card: &AgentCard) -> Result<Self, RegistryError> {
        Ok(Self::new(card.preferred_url()?))
    }

    /// Builder: set the HTTP timeout in seconds.
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send a message via JSON-RPC `message/send` and interpret the task
    /// state of the response.
    pub async fn send_message(&self, message: Message) -> Result<TaskResult, RegistryError> {
        let url = self.endpoint.trim_end_matches('/').to_string();
        log::debug!("sending A2A message to {}", url);

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.timeout))
            .build()
            .map_err(anyhow::Error::from)?;

        let rpc_body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "message/send",
            "id": uuid::Uuid::new_v4().to_string(),
            "params": { "message": message },
        });

        let resp = client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&rpc_body)
            .send()
            .await
            .map_err(anyhow::Error::from)?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RegistryError::Transport(anyhow::anyhow!(
                "A2A message/send failed: HTTP {} - {}",
                status,
                body
            )));
        }

        let rpc_resp: Value = resp.json().await.map_err(anyhow::Error::from)?;
        Ok(Self::interpret_response(&rpc_resp))
    }

    /// Map a JSON-RPC response body onto a [`TaskResult`].
    fn interpret_response(rpc_resp: &Value) -> TaskResult {
        if let Some(error) = rpc_resp.get("error") {
            return TaskResult {
                success: false,
                output: None,
                error: Some(error.to_string()),
            };
        }

        let result = rpc_resp.get("result").cloned().unwrap_or_default();
        let state = result
            .get("status")
            .and_then(|status| status.get("state"))
            .and_then(|state| state.as_str())
            .unwrap_or("unknown");
        let output = result
            .get("artifacts")
            .and_then(|artifacts| artifacts.as_array())
            .and_then(|artifacts| artifacts.first())
            .and_then(|artifact| artifact.get("parts"))
            .and_then(|parts| parts.as_array())
            .and_then(|parts| parts.first())
            .and_then(|part| part.get("text"))
            .and_then(|text| text.as_str())
            .map(|text| text.to_string());

        TaskResult {
            success: state == "completed",
            output,
            error: if state == "failed" {
                Some("task failed".to_string())
            } else {
                None
            },
        }
    }
}
