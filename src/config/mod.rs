/// Configuration management for Mechaflow
///
/// Handles server configuration, database location, and descriptor provider parameters.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Descriptor provider configuration
    pub descriptors: DescriptorConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding the definition database (default: "data")
    /// Creates: {data_dir}/mechaflow.db
    pub data_dir: String,
}

/// Parameters for the descriptor providers and registry refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptorConfig {
    /// Namespace prefixed to every webhook event activity type name
    pub webhook_namespace: String,
    /// Category used when a webhook payload carries no category override
    pub webhook_category: String,
    /// Upper bound for a single registry refresh, in seconds
    pub refresh_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Path of the SQLite database file
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("mechaflow.db")
    }
}

impl DescriptorConfig {
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            webhook_namespace: std::env::var("MECHAFLOW_WEBHOOK_NAMESPACE")
                .unwrap_or_else(|_| "Mechaflow.Webhooks".to_string()),
            webhook_category: std::env::var("MECHAFLOW_WEBHOOK_CATEGORY")
                .unwrap_or_else(|_| "Webhooks".to_string()),
            refresh_timeout_secs: std::env::var("MECHAFLOW_REFRESH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for k8s/container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("MECHAFLOW_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("MECHAFLOW_PORT")
                    .unwrap_or_else(|_| "3004".to_string())
                    .parse()
                    .unwrap_or(3004),
            },
            database: DatabaseConfig {
                data_dir: std::env::var("MECHAFLOW_DATA_DIR")
                    .unwrap_or_else(|_| "data".to_string()),
            },
            descriptors: DescriptorConfig::default(),
        }
    }
}
