#![allow(dead_code)]

use async_trait::async_trait;
use mechaflow::activity::builtin::BuiltinActivityProvider;
use mechaflow::activity::definitions::DefinitionActivityProvider;
use mechaflow::activity::descriptor::ActivityDescriptor;
use mechaflow::activity::provider::ActivityProvider;
use mechaflow::activity::registry::DescriptorRegistry;
use mechaflow::api::AppState;
use mechaflow::client::ApiClient;
use mechaflow::config::DescriptorConfig;
use mechaflow::definition::manager::DefinitionManager;
use mechaflow::definition::storage::DefinitionStore;
use mechaflow::server::create_state;
use mechaflow::Error;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub fn descriptor_config() -> DescriptorConfig {
    DescriptorConfig {
        webhook_namespace: "Mechaflow.Webhooks".to_string(),
        webhook_category: "Webhooks".to_string(),
        refresh_timeout_secs: 5,
    }
}

/// Private in-memory database
///
/// One connection keeps every query on the same in-memory database.
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

/// Fully wired services over a private in-memory database
pub async fn setup() -> AppState {
    create_state(memory_pool().await, &descriptor_config()).await.unwrap()
}

/// Fully wired services over a database file with several pooled connections
pub async fn setup_file_backed(dir: &tempfile::TempDir) -> AppState {
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("mechaflow.db"))
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(10));
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
        .unwrap();

    create_state(pool, &descriptor_config()).await.unwrap()
}

pub fn local_client(state: &AppState) -> ApiClient {
    ApiClient::local(
        state.manager.clone(),
        state.instances.clone(),
        Arc::clone(&state.aliases),
        Arc::clone(&state.variables),
    )
}

/// Provider contributing nothing, which can be switched into failing
#[derive(Default)]
pub struct FlakyProvider {
    failing: AtomicBool,
}

impl FlakyProvider {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ActivityProvider for FlakyProvider {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn get_descriptors(&self, _cancel: &CancellationToken) -> mechaflow::Result<Vec<ActivityDescriptor>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Configuration("provider offline".to_string()));
        }
        Ok(Vec::new())
    }
}

/// Manager whose registry includes a [`FlakyProvider`]
pub struct FlakyHarness {
    pub manager: DefinitionManager,
    pub registry: Arc<DescriptorRegistry>,
    pub provider: Arc<FlakyProvider>,
    pub pool: SqlitePool,
}

pub async fn setup_flaky() -> FlakyHarness {
    let pool = memory_pool().await;
    let store = DefinitionStore::new(pool.clone());
    store.init_schema().await.unwrap();

    let provider = Arc::new(FlakyProvider::default());
    let registry = Arc::new(
        DescriptorRegistry::new(Duration::from_secs(5))
            .with_provider(Arc::new(BuiltinActivityProvider::default()))
            .with_provider(Arc::new(DefinitionActivityProvider::new(store.clone())))
            .with_provider(provider.clone()),
    );
    registry.refresh().await.unwrap();

    FlakyHarness {
        manager: DefinitionManager::new(store, Arc::clone(&registry)),
        registry,
        provider,
        pool,
    }
}
