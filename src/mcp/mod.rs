//! MCP tool-server discovery and dynamically refreshed clients.
//!
//! The registry advertises each MCP server as a descriptor snapshot:
//! endpoints, protocol, and tool specifications. On top of that this module
//! provides:
//!
//! - [`descriptor`]: the server descriptor model and endpoint selection,
//! - [`transports`]: thin JSON-RPC shims over HTTP/SSE endpoints,
//! - [`manager`]: the push-refreshed server cache and dependent registry,
//! - [`client`]: a client wrapper that rebuilds its transport when the
//!   registry pushes a new descriptor,
//! - [`tool`]: per-tool views re-derived from the descriptor on every
//!   change.

pub mod client;
pub mod descriptor;
pub mod manager;
pub mod tool;
pub mod transports;

pub use client::{DynamicMcpClient, PostRefreshHook};
pub use descriptor::{McpEndpoint, McpServerDescriptor, McpToolSpec, McpToolSpecEntry};
pub use manager::McpServerManager;
pub use tool::{DynamicMcpTool, McpToolBuilder, ToolView};
