//! Push-refreshed descriptor discovery.
//!
//! The registry advertises named resources (agent cards, MCP servers) as
//! immutable descriptor snapshots. This module implements the pattern both
//! discovery subsystems share:
//!
//! - a lazy, process-lifetime **descriptor cache** populated on first lookup
//!   or first push event, whichever lands first;
//! - a **dependent registry** mapping each resource name to the consumers
//!   that must rebuild their state when the descriptor changes;
//! - a **dispatcher task** that drains push events from the registry and
//!   propagates refreshes, isolating slow or failing dependents from event
//!   delivery.
//!
//! The registry client itself sits behind the [`DiscoverySource`] seam; this
//! crate never talks a registry wire protocol directly.

pub mod manager;
pub mod source;

pub use manager::{DiscoveryManager, Refreshable};
pub use source::{DiscoverySource, PushEvent};
