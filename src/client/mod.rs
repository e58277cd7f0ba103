/// API client facade
///
/// One handle composing the three resource sub-clients: activity definitions,
/// workflow instances, and activity descriptors. Each sub-client is a narrow
/// request/response contract; `local` implements them in-process on top of
/// the definition manager, the instance store, and the descriptor registry.

// In-process sub-client implementations
pub mod local;

// Editor-side save/publish reconciliation
pub mod sync;

use crate::activity::descriptor::ActivityDescriptorModel;
use crate::definition::manager::SaveOutcome;
use crate::definition::types::{ActivityDefinition, DefinitionSummary, VersionOptions};
use crate::error::Result;
use crate::instance::WorkflowInstance;
use crate::types::VariableDescriptorModel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Save/publish call shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDefinitionRequest {
    pub definition: ActivityDefinition,
    #[serde(default)]
    pub publish: bool,
}

/// Save/publish reply: the server-resolved definition
///
/// `refresh_error` is set when the definition was saved but the descriptor
/// refresh that follows a publish failed. The publish stands; the refresh can
/// be retried on its own through [`DescriptorsApi::refresh`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDefinitionResponse {
    #[serde(flatten)]
    pub definition: ActivityDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_error: Option<String>,
}

impl From<SaveOutcome> for SaveDefinitionResponse {
    fn from(outcome: SaveOutcome) -> Self {
        Self {
            definition: outcome.definition,
            refresh_error: outcome.refresh_error.map(|e| e.to_string()),
        }
    }
}

/// Activity definitions sub-resource
#[async_trait]
pub trait DefinitionsApi: Send + Sync {
    /// Save, returning the server-resolved definition
    async fn save(&self, request: SaveDefinitionRequest) -> Result<SaveDefinitionResponse>;

    async fn get(&self, definition_id: &str, options: VersionOptions) -> Result<ActivityDefinition>;

    async fn list(&self) -> Result<Vec<DefinitionSummary>>;

    /// Version history, newest first
    async fn versions(&self, definition_id: &str) -> Result<Vec<DefinitionSummary>>;

    async fn delete(&self, definition_id: &str) -> Result<()>;
}

/// Workflow instances sub-resource
#[async_trait]
pub trait InstancesApi: Send + Sync {
    async fn list(&self, definition_id: Option<&str>) -> Result<Vec<WorkflowInstance>>;

    async fn get(&self, id: &str) -> Result<WorkflowInstance>;
}

/// Activity descriptors sub-resource
#[async_trait]
pub trait DescriptorsApi: Send + Sync {
    async fn list(&self) -> Result<Vec<ActivityDescriptorModel>>;

    /// Rebuild the server-side descriptor snapshot, returning its size
    async fn refresh(&self) -> Result<usize>;

    async fn list_variables(&self) -> Result<Vec<VariableDescriptorModel>>;
}

/// Composed client handle
#[derive(Clone)]
pub struct ApiClient {
    definitions: Arc<dyn DefinitionsApi>,
    instances: Arc<dyn InstancesApi>,
    descriptors: Arc<dyn DescriptorsApi>,
}

impl ApiClient {
    pub fn new(
        definitions: Arc<dyn DefinitionsApi>,
        instances: Arc<dyn InstancesApi>,
        descriptors: Arc<dyn DescriptorsApi>,
    ) -> Self {
        Self {
            definitions,
            instances,
            descriptors,
        }
    }

    pub fn definitions(&self) -> &Arc<dyn DefinitionsApi> {
        &self.definitions
    }

    pub fn instances(&self) -> &Arc<dyn InstancesApi> {
        &self.instances
    }

    pub fn descriptors(&self) -> &Arc<dyn DescriptorsApi> {
        &self.descriptors
    }
}
