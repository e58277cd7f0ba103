/// Editor-side save/publish reconciliation
///
/// After a save round-trip the editor compares the identity it sent with the
/// identity the server returned. Any difference means the server assigned or
/// changed identity (first save, fork, publish), so the editor adopts the
/// server's copy and reloads the version history. An in-place draft update
/// returns the same identity and triggers no reload.
///
/// The session also remembers the revision each saved row came back with and
/// stamps it on the next save of that row, so a session's own saves never go
/// stale while another editor's out-of-date save is rejected.

use crate::activity::builtin::FLOWCHART_TYPE_NAME;
use crate::activity::descriptor::ActivityDescriptorModel;
use crate::client::{ApiClient, SaveDefinitionRequest, SaveDefinitionResponse};
use crate::definition::types::{ActivityDefinition, DefinitionSummary, VersionOptions};
use crate::error::{Error, Result};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Whether any of the five identity fields differ between request and response
pub fn resync_needed(request: &ActivityDefinition, response: &ActivityDefinition) -> bool {
    request.identity() != response.identity()
}

/// Smallest `{Name}{n}` (n >= 1) not already taken, `Name` being the
/// descriptor's display name without whitespace
pub fn generate_unique_activity_name(existing: &[String], descriptor: &ActivityDescriptorModel) -> String {
    let base: String = descriptor.display_name.split_whitespace().collect();
    let mut n = 1;
    loop {
        let candidate = format!("{}{}", base, n);
        if !existing.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// The editor surface the session drives
#[async_trait]
pub trait DefinitionEditor: Send + Sync {
    /// Open a definition for editing
    async fn show(&self, definition: ActivityDefinition);

    /// The working copy as currently edited
    async fn current_definition(&self) -> ActivityDefinition;

    /// Replace the working copy with the server's
    async fn update_definition(&self, definition: ActivityDefinition);

    /// Replace the version-history view
    async fn load_versions(&self, versions: Vec<DefinitionSummary>);
}

/// Begin/complete bracket around a publish (e.g. a busy indicator)
pub trait PublishProgress: Send + Sync {
    fn begin(&self);
    fn complete(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationEvent {
    Add,
    Update,
}

/// User-facing notification keyed by definition id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: String,
    pub message: String,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn emit(&self, event: NotificationEvent, notification: Notification);
}

/// Client-side copy of the activity descriptor list
///
/// Refreshed independently of the server-side registry so toolbox listings
/// converge with what the server constructs from.
pub struct DescriptorCache {
    client: ApiClient,
    descriptors: ArcSwap<Vec<ActivityDescriptorModel>>,
}

impl DescriptorCache {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            descriptors: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Re-fetch the list; on failure the cached list stays as it was
    pub async fn refresh(&self) -> Result<usize> {
        let descriptors = self.client.descriptors().list().await?;
        let count = descriptors.len();
        self.descriptors.store(Arc::new(descriptors));
        tracing::debug!("Descriptor cache refreshed: {} descriptors", count);
        Ok(count)
    }

    pub fn all(&self) -> Arc<Vec<ActivityDescriptorModel>> {
        self.descriptors.load_full()
    }

    /// Highest version cached for a type name
    pub fn find(&self, type_name: &str) -> Option<ActivityDescriptorModel> {
        self.descriptors
            .load()
            .iter()
            .filter(|d| d.type_name == type_name)
            .max_by_key(|d| d.version)
            .cloned()
    }
}

/// Editing session for activity definitions
pub struct DefinitionSession {
    client: ApiClient,
    editor: Arc<dyn DefinitionEditor>,
    notifications: Arc<dyn NotificationSink>,
    descriptors: Arc<DescriptorCache>,
    /// Key: definition id, Value: (row id, revision) last seen from the server
    revisions: Mutex<HashMap<String, (String, u32)>>,
}

impl DefinitionSession {
    pub fn new(
        client: ApiClient,
        editor: Arc<dyn DefinitionEditor>,
        notifications: Arc<dyn NotificationSink>,
        descriptors: Arc<DescriptorCache>,
    ) -> Self {
        Self {
            client,
            editor,
            notifications,
            descriptors,
            revisions: Mutex::new(HashMap::new()),
        }
    }

    /// Open a blank draft rooted in a flowchart
    pub async fn new_definition(&self) -> Result<ActivityDefinition> {
        let flowchart = self
            .descriptors
            .find(FLOWCHART_TYPE_NAME)
            .ok_or_else(|| Error::NotFound(format!("activity descriptor {}", FLOWCHART_TYPE_NAME)))?;
        let root_id = generate_unique_activity_name(&[], &flowchart);

        let draft = ActivityDefinition::new_draft(&flowchart.type_name, root_id);
        self.editor.show(draft.clone()).await;
        Ok(draft)
    }

    /// Open the latest version of an existing definition
    pub async fn open(&self, definition_id: &str) -> Result<ActivityDefinition> {
        let definition = self
            .client
            .definitions()
            .get(definition_id, VersionOptions::Latest)
            .await?;
        self.remember(&definition).await;
        self.editor.show(definition.clone()).await;
        Ok(definition)
    }

    /// Autosave hook for editor changes (never publishes)
    pub async fn on_definition_updated(&self, definition: ActivityDefinition) -> Result<ActivityDefinition> {
        self.save(definition, false).await
    }

    /// Save and reconcile the editor with the server's identity
    pub async fn save(&self, definition: ActivityDefinition, publish: bool) -> Result<ActivityDefinition> {
        Ok(self.save_request(definition, publish).await?.definition)
    }

    async fn save_request(&self, mut definition: ActivityDefinition, publish: bool) -> Result<SaveDefinitionResponse> {
        self.stamp_revision(&mut definition).await;

        let request = SaveDefinitionRequest {
            definition: definition.clone(),
            publish,
        };
        let response = self.client.definitions().save(request).await?;
        let updated = &response.definition;
        self.remember(updated).await;

        if resync_needed(&definition, updated) {
            tracing::debug!(
                "Identity of {} changed on save (v{} -> v{}), reloading versions",
                updated.definition_id,
                definition.version,
                updated.version
            );
            self.editor.update_definition(updated.clone()).await;
            let versions = self.client.definitions().versions(&updated.definition_id).await?;
            self.editor.load_versions(versions).await;
        }

        Ok(response)
    }

    async fn remember(&self, definition: &ActivityDefinition) {
        if definition.definition_id.is_empty() {
            return;
        }
        self.revisions.lock().await.insert(
            definition.definition_id.clone(),
            (definition.id.clone(), definition.revision),
        );
    }

    /// Use the last revision seen for this row if the editor copy predates it
    async fn stamp_revision(&self, definition: &mut ActivityDefinition) {
        if let Some((id, revision)) = self.revisions.lock().await.get(&definition.definition_id) {
            if *id == definition.id {
                definition.revision = *revision;
            }
        }
    }

    /// Publish the editor's working copy
    ///
    /// `progress` is always completed, even when the save fails. The local
    /// descriptor cache is refreshed only after a successful publish.
    pub async fn publish(&self, progress: &dyn PublishProgress) -> Result<ActivityDefinition> {
        progress.begin();
        let result = self.publish_current().await;
        progress.complete();

        let published = result?;
        self.descriptors.refresh().await?;
        Ok(published)
    }

    async fn publish_current(&self) -> Result<ActivityDefinition> {
        let definition = self.editor.current_definition().await;
        let type_name = definition.type_name.clone();

        self.notifications
            .emit(
                NotificationEvent::Add,
                Notification {
                    id: definition.definition_id.clone(),
                    message: format!("Starting publishing {}", type_name),
                },
            )
            .await;

        let response = self.save_request(definition, true).await?;
        if let Some(refresh_error) = &response.refresh_error {
            tracing::warn!("Server descriptor refresh failed after publish ({}), retrying", refresh_error);
            if let Err(e) = self.client.descriptors().refresh().await {
                tracing::warn!("Descriptor refresh retry failed: {}", e);
            }
        }
        let published = response.definition;

        self.notifications
            .emit(
                NotificationEvent::Update,
                Notification {
                    id: published.definition_id.clone(),
                    message: format!("{} publish finished", type_name),
                },
            )
            .await;

        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::descriptor::ActivityKind;

    fn saved(definition: &ActivityDefinition) -> ActivityDefinition {
        let mut saved = definition.clone();
        saved.id = "v1".to_string();
        saved.definition_id = "def-1".to_string();
        saved
    }

    #[test]
    fn test_first_save_needs_resync() {
        let draft = ActivityDefinition::new_draft(FLOWCHART_TYPE_NAME, "Flowchart1");
        assert!(resync_needed(&draft, &saved(&draft)));
    }

    #[test]
    fn test_in_place_save_needs_no_resync() {
        let draft = saved(&ActivityDefinition::new_draft(FLOWCHART_TYPE_NAME, "Flowchart1"));
        let mut response = draft.clone();
        // Content changes alone do not count
        response.display_name = "Renamed".to_string();
        assert!(!resync_needed(&draft, &response));
    }

    #[test]
    fn test_each_identity_field_triggers_resync() {
        let base = saved(&ActivityDefinition::new_draft(FLOWCHART_TYPE_NAME, "Flowchart1"));
        let mutations: [fn(&mut ActivityDefinition); 5] = [
            |d| d.id = "v2".to_string(),
            |d| d.definition_id = "def-2".to_string(),
            |d| d.version += 1,
            |d| d.is_published = !d.is_published,
            |d| d.is_latest = !d.is_latest,
        ];

        for mutate in mutations {
            let mut response = base.clone();
            mutate(&mut response);
            assert!(resync_needed(&base, &response));
        }
    }

    #[test]
    fn test_unique_activity_name_skips_taken() {
        let descriptor = ActivityDescriptorModel {
            type_name: "Mechaflow.SetVariable".to_string(),
            version: 1,
            display_name: "Set Variable".to_string(),
            category: "Primitives".to_string(),
            description: None,
            kind: ActivityKind::Action,
            is_browsable: true,
            inputs: Vec::new(),
        };

        assert_eq!(generate_unique_activity_name(&[], &descriptor), "SetVariable1");
        let taken = vec!["SetVariable1".to_string(), "SetVariable2".to_string()];
        assert_eq!(generate_unique_activity_name(&taken, &descriptor), "SetVariable3");
    }
}
