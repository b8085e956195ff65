//! The seam between the discovery cache and a concrete registry client.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::registry::RegistryError;

/// A change notification for one named resource.
///
/// Delivered by the registry client whenever its view of the resource
/// changes (topology change, spec edit, endpoint change). The descriptor is
/// a full replacement snapshot, never a partial patch.
#[derive(Debug, Clone)]
pub struct PushEvent<D> {
    /// Name of the resource that changed.
    pub name: String,
    /// The new descriptor snapshot.
    pub descriptor: D,
}

/// A registry client capable of fetch-and-subscribe for named descriptors.
///
/// Implementations wrap a real registry SDK. `subscribe` performs the
/// blocking fetch of the current descriptor and registers for push
/// notifications in one call; subsequent changes for `name` must be sent on
/// the provided channel. Delivering events through a channel (rather than
/// invoking consumers from the registry's callback thread) keeps the
/// registry client decoupled from dependent refresh time.
#[async_trait]
pub trait DiscoverySource: Send + Sync + 'static {
    /// The descriptor type this source resolves.
    type Descriptor: Clone + Send + Sync + 'static;

    /// Fetch the current descriptor for `name` and register for pushes.
    ///
    /// # Errors
    ///
    /// * [`RegistryError::NotFound`] when the resource does not exist.
    /// * [`RegistryError::Unreachable`] when the registry cannot be reached,
    ///   wrapping the registry's native error code.
    async fn subscribe(
        &self,
        name: &str,
        events: mpsc::Sender<PushEvent<Self::Descriptor>>,
    ) -> Result<Self::Descriptor, RegistryError>;

    /// Remove the push registration for `name`.
    async fn unsubscribe(&self, name: &str) -> Result<(), RegistryError>;
}
