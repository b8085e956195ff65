//! Registry-facing primitives shared by the discovery subsystems.
//!
//! The registry itself (consensus, push protocol, persistence) lives in an
//! external service; this module only defines the error taxonomy surfaced
//! from it and the connection configuration handed to source
//! implementations.

pub mod config;
pub mod error;

pub use config::RegistryConfig;
pub use error::RegistryError;
