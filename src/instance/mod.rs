/// Workflow instance records
///
/// Read-mostly bookkeeping of the runs started from published definitions.
/// Only what the instances sub-resource of the API facade needs: create,
/// look up, list, and delete.

use crate::definition::storage::u32_column;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    sqlite::{SqlitePool, SqliteRow},
    Row,
};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a workflow instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceStatus {
    Running,
    Suspended,
    Finished,
    Faulted,
    Cancelled,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstanceStatus::Running => "running",
            InstanceStatus::Suspended => "suspended",
            InstanceStatus::Finished => "finished",
            InstanceStatus::Faulted => "faulted",
            InstanceStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for InstanceStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "running" => Ok(InstanceStatus::Running),
            "suspended" => Ok(InstanceStatus::Suspended),
            "finished" => Ok(InstanceStatus::Finished),
            "faulted" => Ok(InstanceStatus::Faulted),
            "cancelled" => Ok(InstanceStatus::Cancelled),
            other => Err(crate::Error::Validation(format!("unknown instance status: {}", other))),
        }
    }
}

/// One run of a definition version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInstance {
    pub id: String,
    pub definition_id: String,
    pub definition_version: u32,
    pub status: InstanceStatus,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowInstance {
    /// A freshly started run
    pub fn start(definition_id: impl Into<String>, definition_version: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            definition_id: definition_id.into(),
            definition_version,
            status: InstanceStatus::Running,
            created_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// SQLite-based instance storage
#[derive(Debug, Clone)]
pub struct InstanceStore {
    pool: SqlitePool,
}

impl InstanceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workflow_instances (
                id TEXT PRIMARY KEY,
                definition_id TEXT NOT NULL,
                definition_version INTEGER NOT NULL,
                status TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL,
                finished_at TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_workflow_instances_definition ON workflow_instances(definition_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn create(&self, instance: &WorkflowInstance) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO workflow_instances (id, definition_id, definition_version, status, created_at, finished_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&instance.id)
        .bind(&instance.definition_id)
        .bind(instance.definition_version as i64)
        .bind(instance.status.to_string())
        .bind(instance.created_at)
        .bind(instance.finished_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<WorkflowInstance>> {
        let row = sqlx::query(
            "SELECT id, definition_id, definition_version, status, created_at, finished_at FROM workflow_instances WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_instance).transpose()
    }

    /// Instances, newest first, optionally restricted to one definition
    pub async fn list(&self, definition_id: Option<&str>) -> Result<Vec<WorkflowInstance>> {
        let rows = sqlx::query(
            r#"
            SELECT id, definition_id, definition_version, status, created_at, finished_at
            FROM workflow_instances
            WHERE ?1 IS NULL OR definition_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(definition_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_instance).collect()
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM workflow_instances WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_instance(row: &SqliteRow) -> Result<WorkflowInstance> {
    let status: String = row.try_get("status")?;

    Ok(WorkflowInstance {
        id: row.try_get("id")?,
        definition_id: row.try_get("definition_id")?,
        definition_version: u32_column(row, "definition_version")?,
        status: status.parse()?,
        created_at: row.try_get("created_at")?,
        finished_at: row.try_get("finished_at")?,
    })
}
