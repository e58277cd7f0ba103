/// HTTP API Layer
///
/// This module provides the REST API endpoints for:
/// - Activity definition save/publish and version history
/// - Activity and variable descriptor listings
/// - Workflow instance lookups

// Activity definition endpoints (save/publish, get, versions, delete)
pub mod definitions;

// Descriptor listing and refresh endpoints
pub mod descriptors;

// Workflow instance read endpoints
pub mod instances;

use crate::{
    activity::registry::DescriptorRegistry,
    definition::manager::DefinitionManager,
    error::Error,
    instance::InstanceStore,
    types::{TypeAliasRegistry, VariableDescriptor},
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;

// Re-export router builders
pub use definitions::create_definition_routes;
pub use descriptors::create_descriptor_routes;
pub use instances::create_instance_routes;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Save/publish protocol and definition queries
    pub manager: DefinitionManager,
    /// Lock-free descriptor registry
    pub registry: Arc<DescriptorRegistry>,
    /// Workflow instance records
    pub instances: InstanceStore,
    /// Type alias registry used for variable type names
    pub aliases: Arc<TypeAliasRegistry>,
    /// Variable types offered to the designer
    pub variables: Arc<Vec<VariableDescriptor>>,
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            Error::Configuration(_)
            | Error::DuplicateDescriptor { .. }
            | Error::DuplicateAlias { .. }
            | Error::Database(_)
            | Error::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
