/// In-process sub-client implementations
///
/// Transport-free clients that call straight into the server-side services.
/// Used by embedded editors and by tests.

use crate::activity::descriptor::ActivityDescriptorModel;
use crate::activity::registry::DescriptorRegistry;
use crate::client::{
    ApiClient, DefinitionsApi, DescriptorsApi, InstancesApi, SaveDefinitionRequest, SaveDefinitionResponse,
};
use crate::definition::manager::DefinitionManager;
use crate::definition::types::{ActivityDefinition, DefinitionSummary, VersionOptions};
use crate::error::{Error, Result};
use crate::instance::{InstanceStore, WorkflowInstance};
use crate::types::variables::{list_variable_descriptors, VariableDescriptor, VariableDescriptorModel};
use crate::types::TypeAliasRegistry;
use async_trait::async_trait;
use std::sync::Arc;

/// Definitions sub-client backed by a [`DefinitionManager`]
pub struct LocalDefinitionsApi {
    manager: DefinitionManager,
}

impl LocalDefinitionsApi {
    pub fn new(manager: DefinitionManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl DefinitionsApi for LocalDefinitionsApi {
    async fn save(&self, request: SaveDefinitionRequest) -> Result<SaveDefinitionResponse> {
        let outcome = self.manager.save(request.definition, request.publish).await?;
        Ok(outcome.into())
    }

    async fn get(&self, definition_id: &str, options: VersionOptions) -> Result<ActivityDefinition> {
        self.manager.get(definition_id, options).await
    }

    async fn list(&self) -> Result<Vec<DefinitionSummary>> {
        self.manager.list().await
    }

    async fn versions(&self, definition_id: &str) -> Result<Vec<DefinitionSummary>> {
        self.manager.versions(definition_id).await
    }

    async fn delete(&self, definition_id: &str) -> Result<()> {
        self.manager.delete(definition_id).await.map(|_| ())
    }
}

/// Instances sub-client backed by an [`InstanceStore`]
pub struct LocalInstancesApi {
    store: InstanceStore,
}

impl LocalInstancesApi {
    pub fn new(store: InstanceStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl InstancesApi for LocalInstancesApi {
    async fn list(&self, definition_id: Option<&str>) -> Result<Vec<WorkflowInstance>> {
        self.store.list(definition_id).await
    }

    async fn get(&self, id: &str) -> Result<WorkflowInstance> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("workflow instance {}", id)))
    }
}

/// Descriptors sub-client backed by the registry and the variable catalog
pub struct LocalDescriptorsApi {
    registry: Arc<DescriptorRegistry>,
    aliases: Arc<TypeAliasRegistry>,
    variables: Arc<Vec<VariableDescriptor>>,
}

impl LocalDescriptorsApi {
    pub fn new(
        registry: Arc<DescriptorRegistry>,
        aliases: Arc<TypeAliasRegistry>,
        variables: Arc<Vec<VariableDescriptor>>,
    ) -> Self {
        Self {
            registry,
            aliases,
            variables,
        }
    }
}

#[async_trait]
impl DescriptorsApi for LocalDescriptorsApi {
    async fn list(&self) -> Result<Vec<ActivityDescriptorModel>> {
        Ok(self.registry.get_all().models())
    }

    async fn refresh(&self) -> Result<usize> {
        Ok(self.registry.refresh().await?.len())
    }

    async fn list_variables(&self) -> Result<Vec<VariableDescriptorModel>> {
        Ok(list_variable_descriptors(&self.aliases, &self.variables))
    }
}

impl ApiClient {
    /// Client calling directly into in-process services
    pub fn local(
        manager: DefinitionManager,
        instances: InstanceStore,
        aliases: Arc<TypeAliasRegistry>,
        variables: Arc<Vec<VariableDescriptor>>,
    ) -> Self {
        let registry = Arc::clone(manager.registry());
        Self::new(
            Arc::new(LocalDefinitionsApi::new(manager)),
            Arc::new(LocalInstancesApi::new(instances)),
            Arc::new(LocalDescriptorsApi::new(registry, aliases, variables)),
        )
    }
}
