//! Error types for registry lookups and push-driven refresh.
//!
//! The taxonomy mirrors what callers actually need to distinguish:
//! a missing resource (nothing cached, safe to retry), an unreachable
//! registry (wraps the registry's native error code), a timed-out initial
//! fetch, and a failed dependent refresh.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the discovery layer and its consumers.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A caller-supplied parameter was invalid (blank name, bad filter).
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// The named resource does not exist in the registry.
    ///
    /// Surfaced from the initial lookup without caching anything; the next
    /// lookup retries the fetch.
    #[error("resource '{0}' not found")]
    NotFound(String),

    /// The registry could not be reached or returned a server-side error.
    ///
    /// `code` carries the registry's native error code so callers can apply
    /// their own retry policy; this layer performs none.
    #[error("registry unreachable (code {code}): {message}")]
    Unreachable { code: i32, message: String },

    /// The initial blocking fetch exceeded the configured timeout.
    #[error("registry fetch for '{name}' timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    /// A dependent failed to rebuild its state from a new descriptor.
    #[error("refresh of '{name}' failed: {source}")]
    Refresh {
        name: String,
        #[source]
        source: Box<RegistryError>,
    },

    /// A transport-level failure (HTTP, JSON-RPC, malformed response).
    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),

    /// The discovery manager has been closed.
    #[error("discovery manager is closed")]
    Closed,
}

impl RegistryError {
    /// Wrap an error as a refresh failure for the named resource.
    pub fn refresh(name: impl Into<String>, source: RegistryError) -> Self {
        Self::Refresh {
            name: name.into(),
            source: Box::new(source),
        }
    }
}
