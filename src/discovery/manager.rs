//! Descriptor cache, dependent registry, and refresh propagation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::discovery::source::{DiscoverySource, PushEvent};
use crate::registry::config::DEFAULT_FETCH_TIMEOUT;
use crate::registry::{RegistryConfig, RegistryError};

/// Capacity of the push-event channel between the source and the dispatcher.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A consumer bound to one named resource that rebuilds its state when the
/// resource's descriptor changes.
///
/// Membership in the dependent registry is by [`Refreshable::id`] (object
/// identity), not by content equality.
#[async_trait]
pub trait Refreshable<D>: Send + Sync {
    /// Stable identity of this dependent, used for deregistration.
    fn id(&self) -> Uuid;

    /// Rebuild internal state from the new descriptor.
    ///
    /// Errors are propagated with context; the dispatcher logs a failing
    /// dependent and continues with the remaining ones.
    async fn refresh(&self, descriptor: D) -> Result<(), RegistryError>;
}

/// Lazy, push-refreshed cache of named descriptors.
///
/// The first `get` for a name performs a subscribe-and-fetch against the
/// [`DiscoverySource`]; the result is stored with an insert-if-absent so
/// that a push event arriving during the fetch wins the race. Subsequent
/// `get`s return the cached snapshot with no registry round-trip. Entries
/// live until [`DiscoveryManager::close`]; there is no eviction.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use agentmesh::discovery::DiscoveryManager;
/// use agentmesh::testing::MemorySource;
///
/// # async fn example() -> Result<(), agentmesh::registry::RegistryError> {
/// let source = Arc::new(MemorySource::new());
/// source.insert("weather-agent", serde_json::json!({"url": "http://10.0.0.1:8080"}));
///
/// let manager = DiscoveryManager::new(source);
/// let descriptor = manager.get("weather-agent").await?;
/// # Ok(())
/// # }
/// ```
pub struct DiscoveryManager<D: Clone + Send + Sync + 'static> {
    inner: Arc<Inner<D>>,
}

impl<D: Clone + Send + Sync + 'static> Clone for DiscoveryManager<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<D: Clone + Send + Sync + 'static> {
    source: Arc<dyn DiscoverySource<Descriptor = D>>,
    /// Latest descriptor per resource name.
    cache: DashMap<String, D>,
    /// Per-name locks serializing the initial fetch (single-flight).
    fetch_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    /// Dependents to refresh per resource name.
    dependents: DashMap<String, Vec<(Uuid, Arc<dyn Refreshable<D>>)>>,
    /// Names with an active push registration, for teardown.
    subscriptions: DashMap<String, ()>,
    events_tx: mpsc::Sender<PushEvent<D>>,
    fetch_timeout: Duration,
    closed: AtomicBool,
}

impl<D: Clone + Send + Sync + 'static> DiscoveryManager<D> {
    /// Create a manager with the default fetch timeout and start its
    /// dispatcher task.
    pub fn new(source: Arc<dyn DiscoverySource<Descriptor = D>>) -> Self {
        Self::with_fetch_timeout(source, Duration::from_secs(DEFAULT_FETCH_TIMEOUT))
    }

    /// Create a manager using the timeouts from a [`RegistryConfig`].
    pub fn with_config(
        source: Arc<dyn DiscoverySource<Descriptor = D>>,
        config: &RegistryConfig,
    ) -> Self {
        Self::with_fetch_timeout(source, Duration::from_secs(config.fetch_timeout_secs))
    }

    /// Create a manager with an explicit initial-fetch timeout.
    pub fn with_fetch_timeout(
        source: Arc<dyn DiscoverySource<Descriptor = D>>,
        fetch_timeout: Duration,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let inner = Arc::new(Inner {
            source,
            cache: DashMap::new(),
            fetch_locks: DashMap::new(),
            dependents: DashMap::new(),
            subscriptions: DashMap::new(),
            events_tx,
            fetch_timeout,
            closed: AtomicBool::new(false),
        });
        Inner::spawn_dispatcher(Arc::downgrade(&inner), events_rx);
        Self { inner }
    }

    /// Get the descriptor for `name`, fetching and subscribing on first use.
    ///
    /// Exactly one fetch is performed per name regardless of how many
    /// callers race on the first lookup; the others wait for its result.
    /// A failed fetch caches nothing, so the next call retries.
    ///
    /// # Errors
    ///
    /// * [`RegistryError::InvalidParam`] for a blank name.
    /// * [`RegistryError::Timeout`] when the fetch exceeds the configured
    ///   timeout.
    /// * Any error surfaced by the source (`NotFound`, `Unreachable`).
    pub async fn get(&self, name: &str) -> Result<D, RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidParam(
                "resource name must not be blank".to_string(),
            ));
        }
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(RegistryError::Closed);
        }
        if let Some(cached) = self.inner.cache.get(name) {
            return Ok(cached.clone());
        }

        let lock = self
            .inner
            .fetch_locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // A concurrent fetch or a push event may have landed while waiting.
        if let Some(cached) = self.inner.cache.get(name) {
            return Ok(cached.clone());
        }

        log::debug!("fetching descriptor for '{}' from registry", name);
        let fetched = tokio::time::timeout(
            self.inner.fetch_timeout,
            self.inner
                .source
                .subscribe(name, self.inner.events_tx.clone()),
        )
        .await
        .map_err(|_| RegistryError::Timeout {
            name: name.to_string(),
            timeout: self.inner.fetch_timeout,
        })??;
        self.inner.subscriptions.insert(name.to_string(), ());

        // If a push event for this name was dispatched first, its value is
        // canonical and the fetch result is discarded.
        let winner = self
            .inner
            .cache
            .entry(name.to_string())
            .or_insert(fetched)
            .clone();
        Ok(winner)
    }

    /// Return the cached descriptor for `name` without fetching.
    pub fn cached(&self, name: &str) -> Option<D> {
        self.inner.cache.get(name).map(|entry| entry.clone())
    }

    /// Register a dependent to be refreshed when `name`'s descriptor changes.
    ///
    /// Registering the same dependent id twice is a no-op.
    pub fn register_dependent(&self, name: &str, dependent: Arc<dyn Refreshable<D>>) {
        let mut entry = self.inner.dependents.entry(name.to_string()).or_default();
        if entry.iter().any(|(id, _)| *id == dependent.id()) {
            return;
        }
        entry.push((dependent.id(), dependent));
    }

    /// Remove a dependent by id. Unknown ids are ignored.
    pub fn remove_dependent(&self, name: &str, id: Uuid) {
        if let Some(mut entry) = self.inner.dependents.get_mut(name) {
            entry.retain(|(dep_id, _)| *dep_id != id);
        }
    }

    /// Number of dependents currently registered for `name`.
    pub fn dependent_count(&self, name: &str) -> usize {
        self.inner
            .dependents
            .get(name)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }

    /// Tear down the manager: unsubscribe every watched name, drop the
    /// cache and dependent registry, and stop the dispatcher.
    ///
    /// Further `get` calls fail with [`RegistryError::Closed`].
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let names: Vec<String> = self
            .inner
            .subscriptions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for name in names {
            if let Err(e) = self.inner.source.unsubscribe(&name).await {
                log::warn!("failed to unsubscribe '{}' during close: {}", name, e);
            }
        }
        self.inner.subscriptions.clear();
        self.inner.cache.clear();
        self.inner.dependents.clear();
        self.inner.fetch_locks.clear();
    }
}

impl<D: Clone + Send + Sync + 'static> Inner<D> {
    /// Dispatcher: drains push events and propagates refreshes.
    ///
    /// Holds only a weak reference so that dropping the last manager handle
    /// stops the task.
    fn spawn_dispatcher(inner: Weak<Self>, mut events_rx: mpsc::Receiver<PushEvent<D>>) {
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                match inner.upgrade() {
                    Some(inner) => inner.handle_event(event).await,
                    None => break,
                }
            }
            log::debug!("discovery dispatcher stopped");
        });
    }

    async fn handle_event(&self, event: PushEvent<D>) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        log::debug!("descriptor for '{}' changed, refreshing dependents", event.name);
        self.cache.insert(event.name.clone(), event.descriptor.clone());

        // Snapshot before iterating so concurrent add/remove cannot race
        // the notification pass.
        let snapshot: Vec<Arc<dyn Refreshable<D>>> = self
            .dependents
            .get(&event.name)
            .map(|entry| entry.iter().map(|(_, dep)| Arc::clone(dep)).collect())
            .unwrap_or_default();

        for dependent in snapshot {
            if let Err(e) = dependent.refresh(event.descriptor.clone()).await {
                log::error!("dependent refresh for '{}' failed: {}", event.name, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use parking_lot::Mutex;
    use serde_json::{json, Value};

    use super::*;
    use crate::testing::MemorySource;

    struct RecordingDependent {
        id: Uuid,
        seen: Mutex<Vec<Value>>,
        fail: bool,
    }

    impl RecordingDependent {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: Uuid::new_v4(),
                seen: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                id: Uuid::new_v4(),
                seen: Mutex::new(Vec::new()),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl Refreshable<Value> for RecordingDependent {
        fn id(&self) -> Uuid {
            self.id
        }

        async fn refresh(&self, descriptor: Value) -> Result<(), RegistryError> {
            self.seen.lock().push(descriptor);
            if self.fail {
                return Err(RegistryError::refresh(
                    "test",
                    RegistryError::NotFound("test".to_string()),
                ));
            }
            Ok(())
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met within 2s");
    }

    #[tokio::test]
    async fn test_get_fetches_once_and_caches() {
        let source = Arc::new(MemorySource::new());
        source.insert("svc", json!({"v": 1}));
        let manager = DiscoveryManager::new(source.clone());

        assert_eq!(manager.get("svc").await.unwrap(), json!({"v": 1}));
        assert_eq!(manager.get("svc").await.unwrap(), json!({"v": 1}));
        assert_eq!(source.fetch_count("svc"), 1);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let source: Arc<MemorySource<Value>> = Arc::new(MemorySource::new());
        let manager = DiscoveryManager::new(source);
        let err = manager.get("  ").await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidParam(_)));
    }

    #[tokio::test]
    async fn test_concurrent_gets_single_fetch() {
        let source = Arc::new(MemorySource::new());
        source.insert("svc", json!({"v": 1}));
        source.set_fetch_delay(Duration::from_millis(50));
        let manager = DiscoveryManager::new(source.clone());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move { manager.get("svc").await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), json!({"v": 1}));
        }
        assert_eq!(source.fetch_count("svc"), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_caches_nothing_and_retries() {
        let source: Arc<MemorySource<Value>> = Arc::new(MemorySource::new());
        let manager = DiscoveryManager::new(source.clone());

        let err = manager.get("svc").await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
        assert!(manager.cached("svc").is_none());
        assert_eq!(source.fetch_count("svc"), 1);

        source.insert("svc", json!({"v": 2}));
        assert_eq!(manager.get("svc").await.unwrap(), json!({"v": 2}));
        assert_eq!(source.fetch_count("svc"), 2);
    }

    #[tokio::test]
    async fn test_fetch_timeout_surfaced() {
        let source = Arc::new(MemorySource::new());
        source.insert("svc", json!({"v": 1}));
        source.set_fetch_delay(Duration::from_secs(5));
        let manager =
            DiscoveryManager::with_fetch_timeout(source, Duration::from_millis(50));

        let err = manager.get("svc").await.unwrap_err();
        assert!(matches!(err, RegistryError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_push_overwrites_cache() {
        let source = Arc::new(MemorySource::new());
        source.insert("svc", json!({"v": 1}));
        let manager = DiscoveryManager::new(source.clone());
        assert_eq!(manager.get("svc").await.unwrap(), json!({"v": 1}));

        assert!(source.push("svc", json!({"v": 2})).await);
        let manager2 = manager.clone();
        wait_until(move || manager2.cached("svc") == Some(json!({"v": 2}))).await;
        assert_eq!(manager.get("svc").await.unwrap(), json!({"v": 2}));
        // No second fetch; the push populated the cache.
        assert_eq!(source.fetch_count("svc"), 1);
    }

    #[tokio::test]
    async fn test_push_during_fetch_wins_race() {
        let source = Arc::new(MemorySource::new());
        source.insert("svc", json!({"v": "stale"}));
        // The source emits a newer snapshot on the push channel before the
        // blocking fetch returns its stale result.
        source.set_push_before_return("svc", json!({"v": "fresh"}));
        let manager = DiscoveryManager::new(source);

        assert_eq!(manager.get("svc").await.unwrap(), json!({"v": "fresh"}));
        assert_eq!(manager.cached("svc"), Some(json!({"v": "fresh"})));
    }

    #[tokio::test]
    async fn test_two_dependents_each_refreshed_once() {
        let source = Arc::new(MemorySource::new());
        source.insert("svc", json!({"v": 1}));
        let manager = DiscoveryManager::new(source.clone());
        manager.get("svc").await.unwrap();

        let dep_a = RecordingDependent::new();
        let dep_b = RecordingDependent::new();
        manager.register_dependent("svc", dep_a.clone());
        manager.register_dependent("svc", dep_b.clone());
        assert_eq!(manager.dependent_count("svc"), 2);

        source.push("svc", json!({"v": 2})).await;
        let (a, b) = (dep_a.clone(), dep_b.clone());
        wait_until(move || a.seen.lock().len() == 1 && b.seen.lock().len() == 1).await;
        assert_eq!(dep_a.seen.lock()[0], json!({"v": 2}));
        assert_eq!(dep_b.seen.lock()[0], json!({"v": 2}));
    }

    #[tokio::test]
    async fn test_removed_dependent_not_refreshed() {
        let source = Arc::new(MemorySource::new());
        source.insert("svc", json!({"v": 1}));
        let manager = DiscoveryManager::new(source.clone());
        manager.get("svc").await.unwrap();

        let kept = RecordingDependent::new();
        let removed = RecordingDependent::new();
        manager.register_dependent("svc", kept.clone());
        manager.register_dependent("svc", removed.clone());
        manager.remove_dependent("svc", removed.id());
        assert_eq!(manager.dependent_count("svc"), 1);

        source.push("svc", json!({"v": 2})).await;
        let kept2 = kept.clone();
        wait_until(move || kept2.seen.lock().len() == 1).await;
        assert!(removed.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_failing_dependent_does_not_block_others() {
        let source = Arc::new(MemorySource::new());
        source.insert("svc", json!({"v": 1}));
        let manager = DiscoveryManager::new(source.clone());
        manager.get("svc").await.unwrap();

        let failing = RecordingDependent::failing();
        let healthy = RecordingDependent::new();
        manager.register_dependent("svc", failing.clone());
        manager.register_dependent("svc", healthy.clone());

        source.push("svc", json!({"v": 2})).await;
        source.push("svc", json!({"v": 3})).await;
        let healthy2 = healthy.clone();
        wait_until(move || healthy2.seen.lock().len() == 2).await;
        assert_eq!(failing.seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_dependent_registration_ignored() {
        let source = Arc::new(MemorySource::new());
        source.insert("svc", json!({"v": 1}));
        let manager: DiscoveryManager<Value> = DiscoveryManager::new(source);

        let dep = RecordingDependent::new();
        manager.register_dependent("svc", dep.clone());
        manager.register_dependent("svc", dep.clone());
        assert_eq!(manager.dependent_count("svc"), 1);
    }

    #[tokio::test]
    async fn test_close_unsubscribes_and_rejects_gets() {
        let source = Arc::new(MemorySource::new());
        source.insert("svc", json!({"v": 1}));
        let manager = DiscoveryManager::new(source.clone());
        manager.get("svc").await.unwrap();
        assert!(source.subscribed("svc"));

        manager.close().await;
        assert!(!source.subscribed("svc"));
        assert!(matches!(
            manager.get("svc").await.unwrap_err(),
            RegistryError::Closed
        ));
    }

    #[tokio::test]
    async fn test_unreachable_source_error_passthrough() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        struct DownSource;

        #[async_trait]
        impl DiscoverySource for DownSource {
            type Descriptor = Value;

            async fn subscribe(
                &self,
                _name: &str,
                _events: mpsc::Sender<PushEvent<Value>>,
            ) -> Result<Value, RegistryError> {
                CALLS.fetch_add(1, Ordering::SeqCst);
                Err(RegistryError::Unreachable {
                    code: 500,
                    message: "connection reset".to_string(),
                })
            }

            async fn unsubscribe(&self, _name: &str) -> Result<(), RegistryError> {
                Ok(())
            }
        }

        let manager = DiscoveryManager::new(Arc::new(DownSource));
        let err = manager.get("svc").await.unwrap_err();
        assert!(matches!(err, RegistryError::Unreachable { code: 500, .. }));
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }
}
