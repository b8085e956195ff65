//! A2A agent-card discovery, registration, and delegation.
//!
//! Agent cards are immutable metadata snapshots describing a remote A2A
//! agent (endpoint, capabilities, skills). This module provides:
//!
//! - the card model ([`card`]),
//! - card producers ([`producer`]): fixed, well-known HTTP, and
//!   registry-backed with push refresh,
//! - card/endpoint registration to the registry ([`registration`]),
//! - a minimal JSON-RPC client for delegating to a remote agent resolved
//!   from its card ([`client`]).

pub mod card;
pub mod client;
pub mod producer;
pub mod registration;

pub use card::{AgentCapabilities, AgentCard, AgentEndpoint, AgentProvider, AgentSkill};
pub use client::{A2aClient, Message, MessagePart, TaskResult};
pub use producer::{CardProducer, FixedCardProducer, RegistryCardProducer, WellKnownCardProducer};
pub use registration::{A2aRegistration, A2aRegistrationProperties, CardRegistry};
