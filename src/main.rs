/// Mechaflow server entry point
///
/// Initializes configuration and starts the HTTP server with definition
/// publishing and descriptor listing capabilities.

use mechaflow::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Activity definition save/publish at /api/activity-definitions/*
/// - Activity and variable descriptors at /api/descriptors/*
/// - Workflow instances at /api/workflow-instances/*
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (defaults to 0.0.0.0:3004 and data/mechaflow.db)
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
