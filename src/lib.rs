/// Mechaflow: activity descriptors and versioned definition publishing
///
/// This library resolves the activity types a workflow designer can use
/// (built-in, webhook events, and published definitions), and owns the
/// save/publish lifecycle of versioned activity definitions.

// Core configuration and setup
pub mod config;

// Crate-wide error type
pub mod error;

// Type alias registry and variable type catalog
pub mod types;

// Activity descriptors, providers, and the snapshot-swap registry
pub mod activity;

// Versioned activity definitions - storage and the save/publish protocol
pub mod definition;

// Workflow instance records
pub mod instance;

// API client facade and editor-side synchronization
pub mod client;

// HTTP API layer - REST endpoints over definitions, descriptors, and instances
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use activity::{ActivityDescriptor, ActivityProvider, DescriptorRegistry};
pub use client::ApiClient;
pub use definition::{ActivityDefinition, DefinitionManager, VersionOptions};
pub use error::{Error, Result};
pub use server::start_server;
pub use types::{TypeAliasRegistry, TypeInfo};
