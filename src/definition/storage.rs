/// SQLite persistence layer for activity definitions
///
/// Each version of a definition is one row. The full definition is stored as
/// JSON while the identity fields live in indexed columns, which are
/// authoritative when a row is loaded. The partial unique index on
/// `is_latest` makes the single-latest-version invariant hold at the
/// database level too.

use crate::definition::types::{ActivityDefinition, DefinitionSummary, VersionOptions};
use crate::error::{Error, Result};
use sqlx::{
    sqlite::{SqliteConnection, SqlitePool, SqliteRow},
    Row, Sqlite, Transaction,
};

const SELECT_COLUMNS: &str =
    "SELECT id, definition_id, version, is_latest, is_published, revision, data FROM activity_definitions";

/// SQLite-based definition storage
#[derive(Debug, Clone)]
pub struct DefinitionStore {
    /// SQLite connection pool for the definition database
    pool: SqlitePool,
}

impl DefinitionStore {
    /// Create new storage instance with database connection
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the definition storage schema
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS activity_definitions (
                id TEXT PRIMARY KEY,
                definition_id TEXT NOT NULL,
                version INTEGER NOT NULL,
                type_name TEXT NOT NULL,
                is_latest INTEGER NOT NULL DEFAULT 0,
                is_published INTEGER NOT NULL DEFAULT 0,
                revision INTEGER NOT NULL DEFAULT 1,
                data JSON NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (definition_id, version)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // At most one latest row per definition
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_activity_definitions_latest
            ON activity_definitions(definition_id) WHERE is_latest = 1
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_activity_definitions_type_name
            ON activity_definitions(type_name)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Start the transaction a save runs in
    ///
    /// Takes the write lock up front, so concurrent writers queue on the busy
    /// timeout and read the state left by the previous writer instead of
    /// failing to upgrade a read transaction.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// Latest row of a definition, read inside a transaction
    pub async fn find_latest(
        &self,
        conn: &mut SqliteConnection,
        definition_id: &str,
    ) -> Result<Option<ActivityDefinition>> {
        let row = sqlx::query(&format!("{} WHERE definition_id = ? AND is_latest = 1", SELECT_COLUMNS))
            .bind(definition_id)
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(row_to_definition).transpose()
    }

    /// Highest stored version of a definition
    pub async fn max_version(&self, conn: &mut SqliteConnection, definition_id: &str) -> Result<Option<u32>> {
        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM activity_definitions WHERE definition_id = ?")
            .bind(definition_id)
            .fetch_one(&mut *conn)
            .await?;

        max.map(to_u32).transpose()
    }

    /// Definition ids other than `definition_id` that use `type_name`
    pub async fn definitions_using_type(
        &self,
        conn: &mut SqliteConnection,
        type_name: &str,
        definition_id: &str,
    ) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT definition_id FROM activity_definitions WHERE type_name = ? AND definition_id <> ?",
        )
        .bind(type_name)
        .bind(definition_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(ids)
    }

    /// Insert a new version row
    ///
    /// A second row with the same (definition_id, version), or a second latest
    /// row, violates a unique constraint and surfaces as a conflict.
    pub async fn insert(&self, conn: &mut SqliteConnection, definition: &ActivityDefinition) -> Result<()> {
        let data = serde_json::to_string(definition)?;

        sqlx::query(
            r#"
            INSERT INTO activity_definitions (id, definition_id, version, type_name, is_latest, is_published, revision, data)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&definition.id)
        .bind(&definition.definition_id)
        .bind(definition.version as i64)
        .bind(&definition.type_name)
        .bind(definition.is_latest)
        .bind(definition.is_published)
        .bind(definition.revision as i64)
        .bind(&data)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Overwrite an unpublished row in place
    ///
    /// `expected_revision` is the revision the edit was based on; the row is
    /// written with `definition.revision`. Returns false when no unpublished
    /// row with that id, version, and revision exists, i.e. another writer
    /// got there first.
    pub async fn update_draft(
        &self,
        conn: &mut SqliteConnection,
        definition: &ActivityDefinition,
        expected_revision: u32,
    ) -> Result<bool> {
        let data = serde_json::to_string(definition)?;

        let result = sqlx::query(
            r#"
            UPDATE activity_definitions
            SET type_name = ?, revision = ?, data = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND version = ? AND revision = ? AND is_published = 0
            "#,
        )
        .bind(&definition.type_name)
        .bind(definition.revision as i64)
        .bind(&data)
        .bind(&definition.id)
        .bind(definition.version as i64)
        .bind(expected_revision as i64)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Clear the latest flag on whichever row of the definition holds it
    pub async fn demote_latest(&self, conn: &mut SqliteConnection, definition_id: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE activity_definitions
            SET is_latest = 0, updated_at = CURRENT_TIMESTAMP
            WHERE definition_id = ? AND is_latest = 1
            "#,
        )
        .bind(definition_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Clear both flags on every row of the definition except `keep_id`
    pub async fn demote_others(&self, conn: &mut SqliteConnection, definition_id: &str, keep_id: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE activity_definitions
            SET is_latest = 0, is_published = 0, updated_at = CURRENT_TIMESTAMP
            WHERE definition_id = ? AND id <> ? AND (is_latest = 1 OR is_published = 1)
            "#,
        )
        .bind(definition_id)
        .bind(keep_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Flag a row as the published latest version
    ///
    /// Same revision contract as [`DefinitionStore::update_draft`].
    pub async fn mark_published(
        &self,
        conn: &mut SqliteConnection,
        definition: &ActivityDefinition,
        expected_revision: u32,
    ) -> Result<bool> {
        let data = serde_json::to_string(definition)?;

        let result = sqlx::query(
            r#"
            UPDATE activity_definitions
            SET is_latest = 1, is_published = 1, revision = ?, data = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND version = ? AND revision = ?
            "#,
        )
        .bind(definition.revision as i64)
        .bind(&data)
        .bind(&definition.id)
        .bind(definition.version as i64)
        .bind(expected_revision as i64)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Retrieve one version of a definition
    pub async fn get(&self, definition_id: &str, options: VersionOptions) -> Result<Option<ActivityDefinition>> {
        let sql = match options {
            VersionOptions::Latest => format!("{} WHERE definition_id = ? AND is_latest = 1", SELECT_COLUMNS),
            VersionOptions::Published => format!("{} WHERE definition_id = ? AND is_published = 1", SELECT_COLUMNS),
            VersionOptions::Version(_) => format!("{} WHERE definition_id = ? AND version = ?", SELECT_COLUMNS),
        };

        let mut query = sqlx::query(&sql).bind(definition_id);
        if let VersionOptions::Version(version) = options {
            query = query.bind(version as i64);
        }

        let row = query.fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_definition).transpose()
    }

    /// Every version of a definition, newest first
    pub async fn list_versions(&self, definition_id: &str) -> Result<Vec<ActivityDefinition>> {
        let rows = sqlx::query(&format!("{} WHERE definition_id = ? ORDER BY version DESC", SELECT_COLUMNS))
            .bind(definition_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_definition).collect()
    }

    /// Summaries of the latest version of every definition
    pub async fn list_latest(&self) -> Result<Vec<DefinitionSummary>> {
        let rows = sqlx::query(&format!("{} WHERE is_latest = 1 ORDER BY updated_at DESC", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row_to_definition(row).map(|definition| definition.summary()))
            .collect()
    }

    /// Every published version, used to expose definitions as activities
    pub async fn list_published(&self) -> Result<Vec<ActivityDefinition>> {
        let rows = sqlx::query(&format!("{} WHERE is_published = 1 ORDER BY type_name, version", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_definition).collect()
    }

    /// Delete every version of a definition
    ///
    /// Returns (rows deleted, whether any of them was published).
    pub async fn delete(&self, definition_id: &str) -> Result<(u64, bool)> {
        let mut tx = self.begin().await?;

        let published: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM activity_definitions WHERE definition_id = ? AND is_published = 1",
        )
        .bind(definition_id)
        .fetch_one(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM activity_definitions WHERE definition_id = ?")
            .bind(definition_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok((result.rows_affected(), published > 0))
    }
}

/// Decode a row, letting the identity columns override the JSON payload
fn row_to_definition(row: &SqliteRow) -> Result<ActivityDefinition> {
    let data: String = row.try_get("data")?;
    let mut definition: ActivityDefinition = serde_json::from_str(&data)?;

    definition.id = row.try_get("id")?;
    definition.definition_id = row.try_get("definition_id")?;
    definition.version = u32_column(row, "version")?;
    definition.is_latest = row.try_get("is_latest")?;
    definition.is_published = row.try_get("is_published")?;
    definition.revision = u32_column(row, "revision")?;

    Ok(definition)
}

/// Read an INTEGER column that must fit a u32
pub(crate) fn u32_column(row: &SqliteRow, column: &str) -> Result<u32> {
    to_u32(row.try_get::<i64, _>(column)?)
}

fn to_u32(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|e| Error::Database(sqlx::Error::Decode(Box::new(e))))
}
