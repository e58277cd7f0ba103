/// Save/publish protocol for versioned activity definitions
///
/// A save either updates the current draft row in place or, when the latest
/// version is already published, forks a new draft version. Publishing marks
/// the saved row as the single published latest version and then refreshes
/// the descriptor registry so the definition becomes selectable as an activity.
///
/// Identity assignment, forking, demotion, and publishing run in one
/// transaction: a failed save leaves the stored versions exactly as they were.
/// Every row carries a revision; a save based on anything but the stored
/// revision of the latest row is rejected as a conflict.

use crate::activity::registry::DescriptorRegistry;
use crate::definition::storage::DefinitionStore;
use crate::definition::types::{ActivityDefinition, DefinitionSummary, VersionOptions};
use crate::error::{Error, Result};
use sqlx::SqliteConnection;
use std::sync::Arc;

/// Result of a save
#[derive(Debug)]
pub struct SaveOutcome {
    /// The stored row with server-assigned identity
    pub definition: ActivityDefinition,
    /// Set when the post-publish registry refresh failed; the publish itself is durable
    pub refresh_error: Option<Error>,
}

/// How the staged row relates to what was stored before
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveKind {
    Created,
    UpdatedDraft,
    Forked,
    Unchanged,
}

/// Owner of the definition save/publish protocol
#[derive(Debug, Clone)]
pub struct DefinitionManager {
    store: DefinitionStore,
    registry: Arc<DescriptorRegistry>,
}

impl DefinitionManager {
    pub fn new(store: DefinitionStore, registry: Arc<DescriptorRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn store(&self) -> &DefinitionStore {
        &self.store
    }

    pub fn registry(&self) -> &Arc<DescriptorRegistry> {
        &self.registry
    }

    /// Save a definition, optionally publishing it
    ///
    /// Returns the stored row. Concurrent or stale edits are rejected with
    /// [`Error::Conflict`] and nothing is written.
    pub async fn save(&self, definition: ActivityDefinition, publish: bool) -> Result<SaveOutcome> {
        self.validate(&definition)?;

        let (saved, kind) = self.write(definition, publish).await.map_err(lock_conflict)?;

        tracing::info!(
            "💾 Saved definition {} ({}) v{} [{:?}{}]",
            saved.definition_id,
            saved.type_name,
            saved.version,
            kind,
            if publish { ", published" } else { "" }
        );

        let refresh_error = if publish {
            match self.registry.refresh().await {
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("Published {} but descriptor refresh failed: {}", saved.definition_id, e);
                    Some(e)
                }
            }
        } else {
            None
        };

        Ok(SaveOutcome {
            definition: saved,
            refresh_error,
        })
    }

    /// Steps 1 to 3 of a save; dropping the transaction on error rolls back
    async fn write(&self, definition: ActivityDefinition, publish: bool) -> Result<(ActivityDefinition, SaveKind)> {
        let mut tx = self.store.begin().await?;

        let (mut saved, kind) = self.stage(&mut tx, definition, publish).await?;

        if publish && !saved.is_published {
            let demoted = self.store.demote_others(&mut tx, &saved.definition_id, &saved.id).await?;
            let expected_revision = saved.revision;
            saved.is_published = true;
            saved.is_latest = true;
            saved.revision += 1;

            if !self.store.mark_published(&mut tx, &saved, expected_revision).await? {
                return Err(Error::Conflict(format!(
                    "definition {} version {} changed while publishing",
                    saved.definition_id, saved.version
                )));
            }

            tracing::debug!("Demoted {} other versions of {}", demoted, saved.definition_id);
        }

        tx.commit().await?;

        Ok((saved, kind))
    }

    /// Assign identity and write the row (steps 1 and 2 of a save)
    async fn stage(
        &self,
        conn: &mut SqliteConnection,
        mut definition: ActivityDefinition,
        publish: bool,
    ) -> Result<(ActivityDefinition, SaveKind)> {
        if definition.definition_id.is_empty() {
            definition.definition_id = uuid::Uuid::new_v4().to_string();
        }

        self.check_type_name_ownership(conn, &definition).await?;

        let latest = match self.store.find_latest(conn, &definition.definition_id).await? {
            Some(latest) => latest,
            None => {
                // First save of this definition
                definition.id = uuid::Uuid::new_v4().to_string();
                definition.version = 1;
                definition.is_latest = true;
                definition.is_published = false;
                definition.revision = 1;
                definition.created_at = Some(chrono::Utc::now());

                self.store.insert(conn, &definition).await?;
                return Ok((definition, SaveKind::Created));
            }
        };

        let stale_id = !definition.id.is_empty() && definition.id != latest.id;
        if definition.version != latest.version || stale_id || definition.revision != latest.revision {
            tracing::warn!(
                "Rejected stale save of {}: based on v{} r{} ({}), latest is v{} r{} ({})",
                definition.definition_id,
                definition.version,
                definition.revision,
                definition.id,
                latest.version,
                latest.revision,
                latest.id
            );
            return Err(Error::Conflict(format!(
                "definition {} is at version {} revision {}, edit was based on version {} revision {}",
                definition.definition_id, latest.version, latest.revision, definition.version, definition.revision
            )));
        }

        if latest.is_published {
            // Re-publishing the published version untouched is a no-op
            if publish && latest.same_content(&definition) {
                return Ok((latest, SaveKind::Unchanged));
            }

            let next_version = self
                .store
                .max_version(conn, &definition.definition_id)
                .await?
                .unwrap_or(latest.version)
                + 1;

            self.store.demote_latest(conn, &definition.definition_id).await?;

            definition.id = uuid::Uuid::new_v4().to_string();
            definition.version = next_version;
            definition.is_latest = true;
            definition.is_published = false;
            definition.revision = 1;
            definition.created_at = Some(chrono::Utc::now());

            self.store.insert(conn, &definition).await?;
            return Ok((definition, SaveKind::Forked));
        }

        definition.id = latest.id;
        definition.version = latest.version;
        definition.is_latest = true;
        definition.is_published = false;
        definition.revision = latest.revision + 1;
        definition.created_at = latest.created_at;

        if !self.store.update_draft(conn, &definition, latest.revision).await? {
            return Err(Error::Conflict(format!(
                "draft {} version {} was modified concurrently",
                definition.definition_id, definition.version
            )));
        }

        Ok((definition, SaveKind::UpdatedDraft))
    }

    /// Checks that need no storage access
    fn validate(&self, definition: &ActivityDefinition) -> Result<()> {
        if definition.type_name.trim().is_empty() {
            return Err(Error::Validation("type name must not be empty".to_string()));
        }
        if definition.version == 0 {
            return Err(Error::Validation("version must be positive".to_string()));
        }
        if definition.root.type_name.trim().is_empty() {
            return Err(Error::Validation("root activity type must be set".to_string()));
        }
        Ok(())
    }

    /// A definition's type name must not be claimed by another definition or
    /// by a descriptor from another provider
    ///
    /// Definition-backed descriptors in the snapshot may be stale, so other
    /// definitions are only looked up in the store.
    async fn check_type_name_ownership(&self, conn: &mut SqliteConnection, definition: &ActivityDefinition) -> Result<()> {
        let snapshot = self.registry.get_all();
        let provided_elsewhere = snapshot
            .descriptors()
            .iter()
            .any(|d| d.type_name == definition.type_name && d.constructor.definition_id().is_none());
        if provided_elsewhere {
            return Err(Error::Validation(format!(
                "activity type '{}' is already provided by another activity",
                definition.type_name
            )));
        }

        let others = self
            .store
            .definitions_using_type(conn, &definition.type_name, &definition.definition_id)
            .await?;
        if let Some(other) = others.first() {
            return Err(Error::Validation(format!(
                "activity type '{}' is already used by definition {}",
                definition.type_name, other
            )));
        }

        Ok(())
    }

    /// Load one version of a definition
    pub async fn get(&self, definition_id: &str, options: VersionOptions) -> Result<ActivityDefinition> {
        self.store
            .get(definition_id, options)
            .await?
            .ok_or_else(|| Error::NotFound(format!("definition {} ({:?})", definition_id, options)))
    }

    /// Summaries of the latest version of every definition
    pub async fn list(&self) -> Result<Vec<DefinitionSummary>> {
        self.store.list_latest().await
    }

    /// Version history of a definition, newest first
    pub async fn versions(&self, definition_id: &str) -> Result<Vec<DefinitionSummary>> {
        let versions = self.store.list_versions(definition_id).await?;
        if versions.is_empty() {
            return Err(Error::NotFound(format!("definition {}", definition_id)));
        }
        Ok(versions.iter().map(ActivityDefinition::summary).collect())
    }

    /// Delete every version of a definition
    ///
    /// Removing a published version refreshes the registry so its descriptor
    /// disappears; a failed refresh is logged, the deletion stands.
    pub async fn delete(&self, definition_id: &str) -> Result<u64> {
        let (deleted, had_published) = self.store.delete(definition_id).await?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("definition {}", definition_id)));
        }

        tracing::info!("🗑️ Deleted {} versions of definition {}", deleted, definition_id);

        if had_published {
            if let Err(e) = self.registry.refresh().await {
                tracing::warn!("Descriptor refresh after deleting {} failed: {}", definition_id, e);
            }
        }

        Ok(deleted)
    }
}

/// A writer that could not take the database lock lost the race
fn lock_conflict(err: Error) -> Error {
    if let Error::Database(sqlx::Error::Database(db_err)) = &err {
        // SQLITE_BUSY and SQLITE_LOCKED, with their extended codes
        if matches!(db_err.code().as_deref(), Some("5" | "6" | "261" | "262" | "517")) {
            return Error::Conflict(format!("definition is being saved concurrently: {}", db_err.message()));
        }
    }
    err
}
