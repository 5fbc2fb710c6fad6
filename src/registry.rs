use crate::backend::{BackendFactory, DefaultBackends};
use crate::config::Config;
use crate::descriptor::SharedDescriptor;
use crate::discovery::{Discovery, NoDiscovery};
use crate::error::{RemoteError, Result};
use crate::session::RemoteSession;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// One live session per TV configuration
///
/// Sessions are keyed by [`Config::identity`], so two configs with equal
/// field values share a session. Entries are kept for the registry's
/// lifetime. Construction is serialized per identity only; different TVs are
/// set up concurrently.
///
/// # Example
///
/// ```no_run
/// use samsung_remote::{Config, SessionRegistry};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let registry = SessionRegistry::new();
///
///     let first = registry.get_or_create(Config::new("192.168.1.20").with_token("")).await?;
///     let second = registry.get_or_create(Config::new("192.168.1.20").with_token("")).await?;
///     assert!(Arc::ptr_eq(&first, &second));
///
///     first.open().await?;
///     first.control("KEY_VOLDOWN").await?;
///     first.close().await?;
///     Ok(())
/// }
/// ```
pub struct SessionRegistry {
    /// One slot per identity; a slot stays empty until construction succeeds
    sessions: RwLock<HashMap<String, Arc<OnceCell<Arc<RemoteSession>>>>>,
    discovery: Arc<dyn Discovery>,
    backends: Arc<dyn BackendFactory>,
}

impl SessionRegistry {
    /// Registry with no discovery and the built-in engines
    pub fn new() -> Self {
        Self::with_parts(Arc::new(NoDiscovery), Arc::new(DefaultBackends))
    }

    /// Registry using the given discovery and engine factory
    pub fn with_parts(discovery: Arc<dyn Discovery>, backends: Arc<dyn BackendFactory>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            discovery,
            backends,
        }
    }

    pub fn with_discovery(mut self, discovery: impl Discovery + 'static) -> Self {
        self.discovery = Arc::new(discovery);
        self
    }

    pub fn with_backends(mut self, backends: impl BackendFactory + 'static) -> Self {
        self.backends = Arc::new(backends);
        self
    }

    /// Cached session for `config`, without constructing one
    pub fn get(&self, config: &Config) -> Result<Option<Arc<RemoteSession>>> {
        let key = config.identity()?;
        Ok(self
            .sessions
            .read()
            .get(&key)
            .and_then(|slot| slot.get().cloned()))
    }

    /// Cached session for `config`, or a newly constructed one
    ///
    /// Construction runs discovery and protocol selection; a cached session
    /// is returned as is.
    pub async fn get_or_create(&self, config: Config) -> Result<Arc<RemoteSession>> {
        self.get_or_insert(config, None).await
    }

    /// Like [`get_or_create`](Self::get_or_create) with a descriptor the
    /// caller already discovered; discovery is skipped
    pub async fn get_or_create_with_descriptor(
        &self,
        config: Config,
        descriptor: SharedDescriptor,
    ) -> Result<Arc<RemoteSession>> {
        self.get_or_insert(config, Some(descriptor)).await
    }

    async fn get_or_insert(
        &self,
        config: Config,
        descriptor: Option<SharedDescriptor>,
    ) -> Result<Arc<RemoteSession>> {
        let key = config.identity()?;
        let slot = self.slot(&key);

        if let Some(session) = slot.get() {
            tracing::debug!("Reusing session for {}", key);
            return Ok(session.clone());
        }

        // Concurrent callers for the same identity wait here for one build
        let session = slot
            .get_or_try_init(|| async move {
                tracing::debug!("Creating session for {}", key);
                let session = RemoteSession::create(
                    config,
                    descriptor,
                    self.discovery.as_ref(),
                    self.backends.as_ref(),
                )
                .await?;
                Ok::<_, RemoteError>(Arc::new(session))
            })
            .await?;

        Ok(session.clone())
    }

    fn slot(&self, key: &str) -> Arc<OnceCell<Arc<RemoteSession>>> {
        if let Some(slot) = self.sessions.read().get(key) {
            return slot.clone();
        }
        self.sessions
            .write()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    /// Number of cached sessions
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Method;
    use crate::descriptor::DeviceDescriptor;
    use crate::discovery::Discovery;
    use crate::testing::{MockBackends, SlowDiscovery};
    use async_trait::async_trait;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::sync::Barrier;

    /// Answers only once `parties` lookups are in flight at the same time
    struct GatedDiscovery {
        gate: Barrier,
    }

    #[async_trait]
    impl Discovery for GatedDiscovery {
        async fn discover(&self, config: &Config) -> Result<Vec<DeviceDescriptor>> {
            self.gate.wait().await;
            Ok(vec![DeviceDescriptor {
                device_id: config.device_id.clone(),
                ..tizen_tv()
            }])
        }
    }

    fn tizen_tv() -> DeviceDescriptor {
        DeviceDescriptor {
            device_id: Some("uuid:tizen".to_string()),
            host: Some("192.168.1.70".to_string()),
            year: 2018,
            new_generation: true,
            token_auth_supported: true,
            ..Default::default()
        }
    }

    fn registry_with(discovery: Arc<SlowDiscovery>, backends: Arc<MockBackends>) -> SessionRegistry {
        SessionRegistry::with_parts(discovery, backends)
    }

    #[tokio::test]
    async fn test_same_identity_same_session() {
        let backends = Arc::new(MockBackends::default());
        let registry = registry_with(Arc::new(SlowDiscovery::new(vec![])), backends.clone());

        let a = registry.get_or_create(Config::new("10.0.0.9").with_token("")).await.unwrap();
        let b = registry.get_or_create(Config::new("10.0.0.9").with_token("")).await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
        assert_eq!(backends.calls.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_identity_different_session() {
        let backends = Arc::new(MockBackends::default());
        let registry = registry_with(Arc::new(SlowDiscovery::new(vec![])), backends);

        let a = registry.get_or_create(Config::new("10.0.0.9").with_token("")).await.unwrap();
        let b = registry.get_or_create(Config::new("10.0.0.9")).await.unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.method(), Method::Websocket);
        assert_eq!(b.method(), Method::Legacy);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_cached_session_skips_discovery() {
        let discovery = Arc::new(SlowDiscovery::new(vec![tizen_tv()]));
        let registry = registry_with(discovery.clone(), Arc::new(MockBackends::default()));

        let first = registry.get_or_create(Config::for_device("uuid:tizen")).await.unwrap();
        let second = registry.get_or_create(Config::for_device("uuid:tizen")).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.method(), Method::WebsocketSsl);
        assert_eq!(discovery.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_construct_once() {
        let discovery = Arc::new(SlowDiscovery::new(vec![tizen_tv()]));
        let backends = Arc::new(MockBackends::default());
        let registry = registry_with(discovery.clone(), backends.clone());

        let config = Config::for_device("uuid:tizen");
        let (a, b) = tokio::join!(
            registry.get_or_create(config.clone()),
            registry.get_or_create(config)
        );

        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(discovery.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(backends.calls.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_identities_construct_concurrently() {
        let discovery = Arc::new(GatedDiscovery { gate: Barrier::new(2) });
        let registry = SessionRegistry::with_parts(discovery, Arc::new(MockBackends::default()));

        // Each lookup blocks until the other has started, so serialized
        // construction would never finish
        let (living_room, bedroom) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(
                registry.get_or_create(Config::for_device("uuid:living-room")),
                registry.get_or_create(Config::for_device("uuid:bedroom"))
            )
        })
        .await
        .expect("construction of unrelated TVs was serialized");

        assert!(!Arc::ptr_eq(&living_room.unwrap(), &bedroom.unwrap()));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_supplied_descriptor_skips_discovery() {
        let discovery = Arc::new(SlowDiscovery::new(vec![]));
        let registry = registry_with(discovery.clone(), Arc::new(MockBackends::default()));

        let session = registry
            .get_or_create_with_descriptor(Config::for_device("uuid:tizen"), tizen_tv().shared())
            .await
            .unwrap();

        assert_eq!(session.method(), Method::WebsocketSsl);
        assert_eq!(discovery.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_construction_is_not_cached() {
        let registry = registry_with(
            Arc::new(SlowDiscovery::new(vec![])),
            Arc::new(MockBackends::default()),
        );
        let config = Config::for_device("uuid:nowhere");

        let result = registry.get_or_create(config.clone()).await;
        assert!(matches!(result, Err(RemoteError::NoTvFound)));
        assert!(registry.is_empty());
        assert!(registry.get(&config).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_returns_cached_session() {
        let registry = registry_with(
            Arc::new(SlowDiscovery::new(vec![])),
            Arc::new(MockBackends::default()),
        );
        let config = Config::new("10.0.0.9").with_token("abc");

        assert!(registry.get(&config).unwrap().is_none());
        let created = registry.get_or_create(config.clone()).await.unwrap();
        let cached = registry.get(&config).unwrap().unwrap();
        assert!(Arc::ptr_eq(&created, &cached));
    }

    #[tokio::test]
    async fn test_registries_are_isolated() {
        let config = Config::new("10.0.0.9").with_token("");
        let one = registry_with(Arc::new(SlowDiscovery::new(vec![])), Arc::new(MockBackends::default()));
        let two = registry_with(Arc::new(SlowDiscovery::new(vec![])), Arc::new(MockBackends::default()));

        let a = one.get_or_create(config.clone()).await.unwrap();
        let b = two.get_or_create(config).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
