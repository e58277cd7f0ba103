/// Server setup and initialization
///
/// Wires together all components: storage, descriptor providers, the registry,
/// the definition manager, and HTTP routes. Provides the main application
/// factory function for creating the Axum app.

use crate::{
    activity::{
        builtin::BuiltinActivityProvider, definitions::DefinitionActivityProvider,
        registry::DescriptorRegistry, webhook::WebhookEventActivityProvider,
    },
    api::{create_definition_routes, create_descriptor_routes, create_instance_routes, AppState},
    config::{Config, DescriptorConfig},
    definition::{manager::DefinitionManager, storage::DefinitionStore},
    instance::InstanceStore,
    types::{variables::default_variable_descriptors, TypeAliasRegistry},
};
use anyhow::Result;
use axum::{routing::get, Router};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Build the shared services on top of an existing pool
///
/// Creates the schema, validates the webhook payload table, registers every
/// descriptor provider, and performs the initial registry refresh.
pub async fn create_state(pool: SqlitePool, config: &DescriptorConfig) -> Result<AppState> {
    tracing::info!("📋 Initializing definition and instance storage");
    let definition_store = DefinitionStore::new(pool.clone());
    definition_store
        .init_schema()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize definition schema: {}", e))?;

    let instance_store = InstanceStore::new(pool);
    instance_store
        .init_schema()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize instance schema: {}", e))?;

    // A misconfigured payload table is fatal before the server accepts requests
    tracing::info!("🔗 Validating webhook event catalog ({})", config.webhook_namespace);
    let webhook_provider = WebhookEventActivityProvider::from_config(config);
    webhook_provider
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid webhook event catalog: {}", e))?;

    tracing::info!("📊 Initializing descriptor registry");
    let registry = Arc::new(
        DescriptorRegistry::new(config.refresh_timeout())
            .with_provider(Arc::new(BuiltinActivityProvider::default()))
            .with_provider(Arc::new(webhook_provider))
            .with_provider(Arc::new(DefinitionActivityProvider::new(definition_store.clone()))),
    );

    let snapshot = registry
        .refresh()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load activity descriptors: {}", e))?;
    tracing::info!("📥 Loaded {} activity descriptors", snapshot.len());

    let manager = DefinitionManager::new(definition_store, Arc::clone(&registry));

    let aliases = TypeAliasRegistry::with_defaults()
        .map_err(|e| anyhow::anyhow!("Failed to register default type aliases: {}", e))?;

    Ok(AppState {
        manager,
        registry,
        instances: instance_store,
        aliases: Arc::new(aliases),
        variables: Arc::new(default_variable_descriptors()),
    })
}

/// Router with every API endpoint bound to `state`
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check endpoint
        .route("/healthz", get(health_check))
        // Activity definition save/publish and history
        .merge(create_definition_routes().with_state(state.clone()))
        // Activity and variable descriptors
        .merge(create_descriptor_routes().with_state(state.clone()))
        // Workflow instances
        .merge(create_instance_routes().with_state(state))
}

/// Create the main Axum application with all routes
///
/// Opens (or creates) the SQLite database under the configured data
/// directory and builds the application state on top of it.
pub async fn create_app(config: Config) -> Result<Router> {
    tracing::info!("📁 Ensuring data directory exists: {}", config.database.data_dir);
    std::fs::create_dir_all(&config.database.data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create data directory: {}", e))?;

    let db_path = config.database.database_path();
    tracing::debug!("🗄️ Opening database at {}", db_path.display());
    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        // Concurrent saves queue on the write lock for up to this long
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePool::connect_with(options)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open database {}: {}", db_path.display(), e))?;

    let state = create_state(pool, &config.descriptors).await?;

    tracing::info!("📡 Creating HTTP router with all endpoints");
    let app = create_router(state);

    tracing::info!("✅ Application initialized successfully");

    Ok(app)
}

/// Start the HTTP server with the given configuration
///
/// Creates the application and starts the Axum server on the configured address and port.
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting Mechaflow server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
