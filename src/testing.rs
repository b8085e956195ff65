//! In-process [`DiscoverySource`] for tests and examples.
//!
//! `MemorySource` resolves descriptors from a local map, counts fetches,
//! and exposes a push handle so tests can drive registry change events
//! without a running registry.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::discovery::{DiscoverySource, PushEvent};
use crate::registry::RegistryError;

/// An in-memory registry source.
///
/// Behaves like a real source at the seam level: `subscribe` performs a
/// (countable, optionally delayed) fetch and registers the push channel;
/// `push` delivers a change event to whoever subscribed. Unknown names
/// fail with [`RegistryError::NotFound`] and register nothing.
pub struct MemorySource<D> {
    descriptors: DashMap<String, D>,
    senders: DashMap<String, mpsc::Sender<PushEvent<D>>>,
    fetch_counts: DashMap<String, usize>,
    fetch_delay: parking_lot::Mutex<Option<Duration>>,
    push_before_return: DashMap<String, D>,
}

impl<D: Clone + Send + Sync + 'static> Default for MemorySource<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Clone + Send + Sync + 'static> MemorySource<D> {
    pub fn new() -> Self {
        Self {
            descriptors: DashMap::new(),
            senders: DashMap::new(),
            fetch_counts: DashMap::new(),
            fetch_delay: parking_lot::Mutex::new(None),
            push_before_return: DashMap::new(),
        }
    }

    /// Register (or replace) the descriptor served for `name`.
    pub fn insert(&self, name: impl Into<String>, descriptor: D) {
        self.descriptors.insert(name.into(), descriptor);
    }

    /// Remove the descriptor for `name`; later fetches fail with `NotFound`.
    pub fn remove(&self, name: &str) {
        self.descriptors.remove(name);
    }

    /// How many fetches have been performed for `name` (including failed ones).
    pub fn fetch_count(&self, name: &str) -> usize {
        self.fetch_counts.get(name).map(|c| *c).unwrap_or(0)
    }

    /// Whether a push registration for `name` is currently active.
    pub fn subscribed(&self, name: &str) -> bool {
        self.senders.contains_key(name)
    }

    /// Delay every fetch by `delay`, to widen race windows in tests.
    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock() = Some(delay);
    }

    /// Arrange for the next fetch of `name` to emit `descriptor` on the
    /// push channel before the fetch itself returns, simulating a push
    /// notification overtaking a slow initial fetch.
    pub fn set_push_before_return(&self, name: impl Into<String>, descriptor: D) {
        self.push_before_return.insert(name.into(), descriptor);
    }

    /// Deliver a change event for `name`. Also updates the served
    /// descriptor so later fetches observe the same snapshot.
    ///
    /// Returns `false` when nothing is subscribed to `name`.
    pub async fn push(&self, name: &str, descriptor: D) -> bool {
        self.descriptors.insert(name.to_string(), descriptor.clone());
        let sender = match self.senders.get(name) {
            Some(sender) => sender.clone(),
            None => return false,
        };
        sender
            .send(PushEvent {
                name: name.to_string(),
                descriptor,
            })
            .await
            .is_ok()
    }
}

#[async_trait]
impl<D: Clone + Send + Sync + 'static> DiscoverySource for MemorySource<D> {
    type Descriptor = D;

    async fn subscribe(
        &self,
        name: &str,
        events: mpsc::Sender<PushEvent<D>>,
    ) -> Result<D, RegistryError> {
        *self.fetch_counts.entry(name.to_string()).or_insert(0) += 1;

        let delay = *self.fetch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some((_, newer)) = self.push_before_return.remove(name) {
            let _ = events
                .send(PushEvent {
                    name: name.to_string(),
                    descriptor: newer,
                })
                .await;
            // Give the dispatcher time to land the pushed value first.
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let descriptor = self
            .descriptors
            .get(name)
            .map(|entry| entry.clone())
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        self.senders.insert(name.to_string(), events);
        Ok(descriptor)
    }

    async fn unsubscribe(&self, name: &str) -> Result<(), RegistryError> {
        self.senders.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio_test::assert_ok;

    use super::*;

    #[tokio::test]
    async fn test_subscribe_unknown_name_fails_without_registering() {
        let source: MemorySource<serde_json::Value> = MemorySource::new();
        let (tx, _rx) = mpsc::channel(4);
        let err = source.subscribe("ghost", tx).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
        assert!(!source.subscribed("ghost"));
        assert_eq!(source.fetch_count("ghost"), 1);
    }

    #[tokio::test]
    async fn test_push_without_subscriber_returns_false() {
        let source = MemorySource::new();
        assert!(!source.push("svc", json!({"v": 1})).await);
    }

    #[tokio::test]
    async fn test_push_delivers_to_subscriber() {
        let source = MemorySource::new();
        source.insert("svc", json!({"v": 1}));
        let (tx, mut rx) = mpsc::channel(4);
        assert_ok!(source.subscribe("svc", tx).await);

        assert!(source.push("svc", json!({"v": 2})).await);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, "svc");
        assert_eq!(event.descriptor, json!({"v": 2}));
    }
}
