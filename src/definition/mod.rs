/// Definition Management Layer
///
/// This module handles versioned activity definitions:
/// - Type definitions (ActivityDefinition, Flowchart, DefinitionIdentity)
/// - SQLite persistence with sqlx
/// - The save/publish protocol and version lifecycle

// Core definition type definitions
pub mod types;

// SQLite persistence layer for definition versions
pub mod storage;

// Save/publish protocol
pub mod manager;

// Re-export commonly used types
pub use manager::{DefinitionManager, SaveOutcome};
pub use storage::DefinitionStore;
pub use types::{ActivityDefinition, DefinitionIdentity, DefinitionSummary, Flowchart, VersionOptions};
