/// Published definitions as activities
///
/// Every published definition version contributes one descriptor, so a
/// definition becomes selectable in other definitions once it is published
/// and the registry has been refreshed.

use crate::activity::descriptor::{ActivityConstructor, ActivityDescriptor, ActivityKind};
use crate::activity::provider::ActivityProvider;
use crate::definition::storage::DefinitionStore;
use crate::definition::types::ActivityDefinition;
use crate::error::{Error, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Implementation every definition-backed descriptor constructs
pub const DEFINITION_ACTIVITY: &str = "Mechaflow.DefinitionActivity";

/// Provider reading published definitions from the definition store
#[derive(Debug, Clone)]
pub struct DefinitionActivityProvider {
    store: DefinitionStore,
}

impl DefinitionActivityProvider {
    pub fn new(store: DefinitionStore) -> Self {
        Self { store }
    }
}

/// Descriptor a published definition is exposed as
pub fn definition_descriptor(definition: &ActivityDefinition) -> ActivityDescriptor {
    ActivityDescriptor {
        type_name: definition.type_name.clone(),
        version: definition.version,
        display_name: definition.display_name.clone(),
        category: definition.category.clone(),
        description: definition.description.clone(),
        kind: ActivityKind::Action,
        is_browsable: true,
        activity_type: DEFINITION_ACTIVITY.to_string(),
        inputs: definition.root.variables.iter().map(|v| v.name.clone()).collect(),
        constructor: ActivityConstructor::Definition {
            type_name: definition.type_name.clone(),
            definition_id: definition.definition_id.clone(),
            version: definition.version,
        },
    }
}

#[async_trait]
impl ActivityProvider for DefinitionActivityProvider {
    fn name(&self) -> &str {
        "definitions"
    }

    async fn get_descriptors(&self, cancel: &CancellationToken) -> Result<Vec<ActivityDescriptor>> {
        let published = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            published = self.store.list_published() => published?,
        };

        Ok(published.iter().map(definition_descriptor).collect())
    }
}
