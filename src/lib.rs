//! # agentmesh
//!
//! Registry-backed discovery glue for AI agent frameworks: agent cards
//! over A2A and tool servers over MCP, both kept current by registry push
//! notifications instead of polling.
//!
//! The crate is built around one pattern, implemented once in
//! [`discovery`] and instantiated twice:
//!
//! - **Lazy fetch, push overwrite.** The first lookup of a name fetches
//!   its descriptor from the registry and subscribes for changes; from
//!   then on the cached snapshot is served and overwritten whenever the
//!   registry pushes a new one.
//! - **Dependent refresh.** Consumers derived from a descriptor (MCP
//!   clients, tool views, toolkit registrations) register as dependents
//!   and are rebuilt from the new snapshot on every push.
//!
//! ## Modules
//!
//! - [`discovery`]: the generic cache, dependent registry, and dispatcher.
//! - [`a2a`]: agent cards, card producers, and card registration.
//! - [`mcp`]: MCP server descriptors, transports, dynamic clients, tools.
//! - [`toolkit`]: the agent-facing tool registry.
//! - [`registry`]: shared configuration and the error type.
//! - [`testing`]: an in-memory [`DiscoverySource`] for tests and examples.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use agentmesh::mcp::McpServerManager;
//! use agentmesh::testing::MemorySource;
//! use agentmesh::toolkit::Toolkit;
//!
//! # async fn example() -> Result<(), agentmesh::registry::RegistryError> {
//! let source = Arc::new(MemorySource::new());
//! source.insert(
//!     "maps-server",
//!     agentmesh::mcp::McpServerDescriptor::new("maps-server", "streamable-http"),
//! );
//! let manager = McpServerManager::new(source);
//!
//! let client = manager.client("maps-server").await?;
//! let toolkit = Toolkit::new();
//! toolkit.register_mcp_client(client, None, None, Some("maps".to_string()))?;
//! // Tools in `toolkit` now follow the registry automatically.
//! # Ok(())
//! # }
//! ```

pub mod a2a;
pub mod discovery;
pub mod mcp;
pub mod registry;
pub mod testing;
pub mod toolkit;

pub use a2a::{A2aRegistration, AgentCard, AgentEndpoint, CardProducer, RegistryCardProducer};
pub use discovery::{DiscoveryManager, DiscoverySource, PushEvent, Refreshable};
pub use mcp::{DynamicMcpClient, DynamicMcpTool, McpServerDescriptor, McpServerManager};
pub use registry::{RegistryConfig, RegistryError};
pub use toolkit::{AgentTool, Toolkit};

/// Crate version, for diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
