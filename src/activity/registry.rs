/// Lock-free activity descriptor registry using ArcSwap
///
/// Aggregates every provider's descriptors into one immutable snapshot. A
/// refresh re-queries all providers and swaps the whole snapshot pointer, so
/// readers always see either the old or the new descriptor set in full. A
/// refresh that fails, times out, or is cancelled leaves the current snapshot
/// untouched.

use crate::activity::descriptor::{ActivityDescriptor, ActivityDescriptorModel};
use crate::activity::provider::ActivityProvider;
use crate::error::{Error, Result};
use arc_swap::ArcSwap;
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Immutable set of descriptors produced by one refresh
#[derive(Debug, Default)]
pub struct DescriptorSnapshot {
    /// Ticket of the refresh that built this snapshot (0 = never refreshed)
    generation: u64,
    descriptors: Vec<ActivityDescriptor>,
    /// Key: (type_name, version), Value: index into `descriptors`
    index: HashMap<(String, u32), usize>,
    /// Key: type_name, Value: index of its highest version
    latest: HashMap<String, usize>,
}

impl DescriptorSnapshot {
    /// Index descriptors, rejecting duplicate (type_name, version) keys
    fn build(generation: u64, descriptors: Vec<ActivityDescriptor>) -> Result<Self> {
        let mut index = HashMap::with_capacity(descriptors.len());
        let mut latest: HashMap<String, usize> = HashMap::new();

        for (position, descriptor) in descriptors.iter().enumerate() {
            let key = (descriptor.type_name.clone(), descriptor.version);
            if index.insert(key, position).is_some() {
                return Err(Error::DuplicateDescriptor {
                    type_name: descriptor.type_name.clone(),
                    version: descriptor.version,
                });
            }

            latest
                .entry(descriptor.type_name.clone())
                .and_modify(|current| {
                    if descriptors[*current].version < descriptor.version {
                        *current = position;
                    }
                })
                .or_insert(position);
        }

        Ok(Self {
            generation,
            descriptors,
            index,
            latest,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn descriptors(&self) -> &[ActivityDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Exact lookup by type name and version
    pub fn find(&self, type_name: &str, version: u32) -> Option<&ActivityDescriptor> {
        self.index
            .get(&(type_name.to_string(), version))
            .map(|position| &self.descriptors[*position])
    }

    /// Highest version registered for a type name
    pub fn find_latest(&self, type_name: &str) -> Option<&ActivityDescriptor> {
        self.latest.get(type_name).map(|position| &self.descriptors[*position])
    }

    /// Listing projection of every descriptor
    pub fn models(&self) -> Vec<ActivityDescriptorModel> {
        self.descriptors.iter().map(ActivityDescriptor::to_model).collect()
    }
}

/// Registry aggregating all registered providers
pub struct DescriptorRegistry {
    /// Registration order is preserved in the snapshot
    providers: Vec<Arc<dyn ActivityProvider>>,
    /// Thread-safe atomic pointer to the current snapshot
    snapshot: ArcSwap<DescriptorSnapshot>,
    /// Last refresh ticket handed out
    tickets: AtomicU64,
    refresh_timeout: Duration,
}

impl std::fmt::Debug for DescriptorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorRegistry")
            .field("providers", &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("generation", &self.generation())
            .finish()
    }
}

impl DescriptorRegistry {
    /// Create an empty registry; nothing is visible until the first refresh
    pub fn new(refresh_timeout: Duration) -> Self {
        Self {
            providers: Vec::new(),
            snapshot: ArcSwap::from_pointee(DescriptorSnapshot::default()),
            tickets: AtomicU64::new(0),
            refresh_timeout,
        }
    }

    /// Register a provider; call before the registry is shared
    pub fn with_provider(mut self, provider: Arc<dyn ActivityProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Current snapshot (lock-free read)
    ///
    /// Hold on to the returned `Arc` for the duration of an operation to keep
    /// a consistent view across several lookups.
    pub fn get_all(&self) -> Arc<DescriptorSnapshot> {
        self.snapshot.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.snapshot.load().generation
    }

    pub fn find(&self, type_name: &str, version: u32) -> Option<ActivityDescriptor> {
        self.snapshot.load().find(type_name, version).cloned()
    }

    pub fn find_latest(&self, type_name: &str) -> Option<ActivityDescriptor> {
        self.snapshot.load().find_latest(type_name).cloned()
    }

    /// Rebuild the snapshot from every provider
    pub async fn refresh(&self) -> Result<Arc<DescriptorSnapshot>> {
        self.refresh_with(&CancellationToken::new()).await
    }

    /// Rebuild the snapshot, stopping early if `cancel` fires or the refresh
    /// timeout elapses
    ///
    /// Providers are queried concurrently. The new snapshot replaces the
    /// current one only if no later refresh has already been published.
    pub async fn refresh_with(&self, cancel: &CancellationToken) -> Result<Arc<DescriptorSnapshot>> {
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let provider_cancel = cancel.child_token();

        tracing::debug!("🔄 Refreshing activity descriptors (ticket {}, {} providers)", ticket, self.providers.len());

        let query = try_join_all(self.providers.iter().map(|provider| {
            let token = provider_cancel.clone();
            async move {
                provider.get_descriptors(&token).await.map_err(|e| {
                    tracing::warn!("Activity provider '{}' failed: {}", provider.name(), e);
                    e
                })
            }
        }));

        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = tokio::time::timeout(self.refresh_timeout, query) => match result {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("Descriptor refresh timed out after {:?}", self.refresh_timeout);
                    Err(Error::Cancelled)
                }
            },
        };
        // Stop any provider still running after an early exit
        provider_cancel.cancel();

        let descriptors: Vec<ActivityDescriptor> = match outcome {
            Ok(sets) => sets.into_iter().flatten().collect(),
            Err(e) => {
                tracing::warn!("Descriptor refresh aborted, keeping generation {}: {}", self.generation(), e);
                return Err(e);
            }
        };

        let snapshot = Arc::new(DescriptorSnapshot::build(ticket, descriptors)?);

        let previous = self.snapshot.rcu(|current| {
            if current.generation > ticket {
                Arc::clone(current)
            } else {
                Arc::clone(&snapshot)
            }
        });

        if previous.generation > ticket {
            tracing::debug!("Discarded stale descriptor refresh {} (current {})", ticket, previous.generation);
            return Ok(self.get_all());
        }

        tracing::info!("📚 Activity descriptors refreshed: {} descriptors (generation {})", snapshot.len(), ticket);

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::builtin::{BuiltinActivityProvider, FLOWCHART_TYPE_NAME};
    use crate::activity::descriptor::{ActivityConstructor, ActivityKind};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;

    fn descriptor(type_name: &str, version: u32) -> ActivityDescriptor {
        ActivityDescriptor {
            type_name: type_name.to_string(),
            version,
            display_name: type_name.to_string(),
            category: "Test".to_string(),
            description: None,
            kind: ActivityKind::Action,
            is_browsable: true,
            activity_type: type_name.to_string(),
            inputs: Vec::new(),
            constructor: ActivityConstructor::Builtin {
                type_name: type_name.to_string(),
                version,
            },
        }
    }

    /// Provider whose output and failure mode can be flipped between refreshes
    struct SwitchProvider {
        descriptors: std::sync::Mutex<Vec<ActivityDescriptor>>,
        fail: AtomicBool,
    }

    impl SwitchProvider {
        fn new(descriptors: Vec<ActivityDescriptor>) -> Self {
            Self {
                descriptors: std::sync::Mutex::new(descriptors),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl ActivityProvider for SwitchProvider {
        fn name(&self) -> &str {
            "switch"
        }

        async fn get_descriptors(&self, _cancel: &CancellationToken) -> Result<Vec<ActivityDescriptor>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Configuration("provider offline".to_string()));
            }
            Ok(self.descriptors.lock().unwrap().clone())
        }
    }

    /// Provider that never finishes unless cancelled
    struct StuckProvider;

    #[async_trait]
    impl ActivityProvider for StuckProvider {
        fn name(&self) -> &str {
            "stuck"
        }

        async fn get_descriptors(&self, cancel: &CancellationToken) -> Result<Vec<ActivityDescriptor>> {
            cancel.cancelled().await;
            Err(Error::Cancelled)
        }
    }

    #[tokio::test]
    async fn test_empty_until_first_refresh() {
        let registry = DescriptorRegistry::new(Duration::from_secs(5))
            .with_provider(Arc::new(BuiltinActivityProvider::default()));

        assert!(registry.get_all().is_empty());
        assert_eq!(registry.generation(), 0);

        registry.refresh().await.unwrap();
        assert_eq!(registry.generation(), 1);
        assert!(registry.find(FLOWCHART_TYPE_NAME, 1).is_some());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let provider = Arc::new(SwitchProvider::new(vec![descriptor("A", 1)]));
        let registry = DescriptorRegistry::new(Duration::from_secs(5)).with_provider(provider.clone());
        registry.refresh().await.unwrap();

        let before = registry.get_all();
        provider.fail.store(true, Ordering::SeqCst);
        *provider.descriptors.lock().unwrap() = vec![descriptor("B", 1)];

        assert!(registry.refresh().await.is_err());
        let after = registry.get_all();
        assert!(Arc::ptr_eq(&before, &after));
        assert!(registry.find("A", 1).is_some());
    }

    #[tokio::test]
    async fn test_duplicate_keys_across_providers_rejected() {
        let registry = DescriptorRegistry::new(Duration::from_secs(5))
            .with_provider(Arc::new(SwitchProvider::new(vec![descriptor("A", 1)])))
            .with_provider(Arc::new(SwitchProvider::new(vec![descriptor("A", 1)])));

        let err = registry.refresh().await.unwrap_err();
        assert!(matches!(err, Error::DuplicateDescriptor { ref type_name, version: 1 } if type_name == "A"));
        assert!(registry.get_all().is_empty());
    }

    #[tokio::test]
    async fn test_find_latest_picks_highest_version() {
        let registry = DescriptorRegistry::new(Duration::from_secs(5)).with_provider(Arc::new(SwitchProvider::new(vec![
            descriptor("A", 2),
            descriptor("A", 5),
            descriptor("A", 3),
        ])));
        registry.refresh().await.unwrap();

        assert_eq!(registry.find_latest("A").unwrap().version, 5);
        assert_eq!(registry.find("A", 3).unwrap().version, 3);
        assert!(registry.find("A", 4).is_none());
    }

    #[tokio::test]
    async fn test_cancelled_refresh_leaves_snapshot() {
        let registry = DescriptorRegistry::new(Duration::from_secs(5))
            .with_provider(Arc::new(BuiltinActivityProvider::default()))
            .with_provider(Arc::new(StuckProvider));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = registry.refresh_with(&cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(registry.generation(), 0);
    }

    #[tokio::test]
    async fn test_refresh_timeout_cancels_providers() {
        let registry = DescriptorRegistry::new(Duration::from_millis(20)).with_provider(Arc::new(StuckProvider));

        let err = registry.refresh().await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(registry.get_all().is_empty());
    }

    #[tokio::test]
    async fn test_readers_keep_their_snapshot_across_refresh() {
        let provider = Arc::new(SwitchProvider::new(vec![descriptor("A", 1)]));
        let registry = DescriptorRegistry::new(Duration::from_secs(5)).with_provider(provider.clone());
        registry.refresh().await.unwrap();

        let held = registry.get_all();
        *provider.descriptors.lock().unwrap() = vec![descriptor("B", 1)];
        registry.refresh().await.unwrap();

        assert!(held.find("A", 1).is_some());
        assert!(held.find("B", 1).is_none());
        assert!(registry.find("B", 1).is_some());
        assert!(registry.find("A", 1).is_none());
    }
}
