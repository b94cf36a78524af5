use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgPool};

use tessera_application::DirectoryRepository;
use tessera_core::{AppError, AppResult, DirectoryId, FieldId};
use tessera_domain::{Directory, DirectoryField, DirectoryType, FieldMetadata, FieldType};

use crate::postgres_errors::{is_foreign_key_violation, is_unique_violation, store_error};

/// PostgreSQL-backed repository for directory schemas.
#[derive(Clone)]
pub struct PostgresDirectoryRepository {
    pool: PgPool,
}

impl PostgresDirectoryRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct DirectoryRow {
    id: uuid::Uuid,
    name: String,
    icon: Option<String>,
    directory_type: String,
    metadata: Value,
}

#[derive(Debug, FromRow)]
struct FieldRow {
    id: uuid::Uuid,
    directory_id: uuid::Uuid,
    name: String,
    field_type: String,
    relation_id: Option<uuid::Uuid>,
    metadata: Value,
}

const FIELD_COLUMNS: &str = "id, directory_id, name, field_type, relation_id, metadata";

#[async_trait]
impl DirectoryRepository for PostgresDirectoryRepository {
    async fn save_directory(&self, directory: Directory) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO directories (id, name, icon, directory_type, metadata)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(directory.id().as_uuid())
        .bind(directory.name().as_str())
        .bind(directory.icon())
        .bind(directory.directory_type().as_str())
        .bind(directory.metadata())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                return AppError::Conflict(format!(
                    "directory '{}' already exists",
                    directory.name().as_str()
                ));
            }

            store_error("failed to save directory", error)
        })?;

        Ok(())
    }

    async fn find_directory(&self, directory_id: DirectoryId) -> AppResult<Option<Directory>> {
        let row = sqlx::query_as::<_, DirectoryRow>(
            r#"
            SELECT id, name, icon, directory_type, metadata
            FROM directories
            WHERE id = $1
            "#,
        )
        .bind(directory_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to find directory", error))?;

        row.map(directory_from_row).transpose()
    }

    async fn list_directories(&self) -> AppResult<Vec<Directory>> {
        let rows = sqlx::query_as::<_, DirectoryRow>(
            r#"
            SELECT id, name, icon, directory_type, metadata
            FROM directories
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list directories", error))?;

        rows.into_iter().map(directory_from_row).collect()
    }

    async fn delete_directory(&self, directory_id: DirectoryId) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            store_error("failed to start directory delete transaction", error)
        })?;

        sqlx::query(
            r#"
            DELETE FROM directory_values
            WHERE directory_record_id IN (
                SELECT records.id
                FROM directory_records AS records
                JOIN company_directories AS enablements
                    ON enablements.id = records.company_directory_id
                WHERE enablements.directory_id = $1
            )
            "#,
        )
        .bind(directory_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| store_error("failed to delete directory values", error))?;

        sqlx::query(
            r#"
            DELETE FROM directory_records
            WHERE company_directory_id IN (
                SELECT id FROM company_directories WHERE directory_id = $1
            )
            "#,
        )
        .bind(directory_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| store_error("failed to delete directory records", error))?;

        sqlx::query("DELETE FROM company_directories WHERE directory_id = $1")
            .bind(directory_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| store_error("failed to delete directory enablements", error))?;

        sqlx::query("DELETE FROM directories WHERE id = $1")
            .bind(directory_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                if is_foreign_key_violation(&error) {
                    return AppError::Conflict(format!(
                        "directory '{directory_id}' is still referenced by relation fields"
                    ));
                }

                store_error("failed to delete directory", error)
            })?;

        transaction
            .commit()
            .await
            .map_err(|error| store_error("failed to commit directory delete", error))
    }

    async fn save_field(&self, field: DirectoryField) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO directory_fields (id, directory_id, name, field_type, relation_id, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id)
            DO UPDATE SET
                name = EXCLUDED.name,
                field_type = EXCLUDED.field_type,
                relation_id = EXCLUDED.relation_id,
                metadata = EXCLUDED.metadata
            "#,
        )
        .bind(field.id().as_uuid())
        .bind(field.directory_id().as_uuid())
        .bind(field.name().as_str())
        .bind(field.field_type().as_str())
        .bind(field.relation_id().map(|directory_id| directory_id.as_uuid()))
        .bind(field.metadata().to_json())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                return AppError::Conflict(format!(
                    "field '{}' already exists in directory '{}'",
                    field.name().as_str(),
                    field.directory_id()
                ));
            }
            if is_foreign_key_violation(&error) {
                return AppError::NotFound(format!(
                    "directory of field '{}' does not exist",
                    field.name().as_str()
                ));
            }

            store_error("failed to save directory field", error)
        })?;

        Ok(())
    }

    async fn find_field(&self, field_id: FieldId) -> AppResult<Option<DirectoryField>> {
        let row = sqlx::query_as::<_, FieldRow>(&format!(
            "SELECT {FIELD_COLUMNS} FROM directory_fields WHERE id = $1"
        ))
        .bind(field_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to find directory field", error))?;

        row.map(field_from_row).transpose()
    }

    async fn list_fields(&self, directory_id: DirectoryId) -> AppResult<Vec<DirectoryField>> {
        let rows = sqlx::query_as::<_, FieldRow>(&format!(
            r#"
            SELECT {FIELD_COLUMNS}
            FROM directory_fields
            WHERE directory_id = $1
            ORDER BY position
            "#
        ))
        .bind(directory_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list directory fields", error))?;

        rows.into_iter().map(field_from_row).collect()
    }

    async fn list_referencing_fields(
        &self,
        directory_id: DirectoryId,
    ) -> AppResult<Vec<DirectoryField>> {
        let rows = sqlx::query_as::<_, FieldRow>(&format!(
            r#"
            SELECT {FIELD_COLUMNS}
            FROM directory_fields
            WHERE directory_id <> $1
                AND (
                    relation_id = $1
                    OR (
                        metadata ->> 'isCascadingTrigger' = 'true'
                        AND metadata ->> 'cascadingDirectoryId' = $2
                    )
                )
            ORDER BY position
            "#
        ))
        .bind(directory_id.as_uuid())
        .bind(directory_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list referencing fields", error))?;

        rows.into_iter().map(field_from_row).collect()
    }

    async fn list_cascading_trigger_fields(&self) -> AppResult<Vec<DirectoryField>> {
        let rows = sqlx::query_as::<_, FieldRow>(&format!(
            r#"
            SELECT {FIELD_COLUMNS}
            FROM directory_fields
            WHERE metadata ->> 'isCascadingTrigger' = 'true'
                AND metadata ->> 'cascadingDirectoryId' IS NOT NULL
            ORDER BY position
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list cascading trigger fields", error))?;

        rows.into_iter().map(field_from_row).collect()
    }

    async fn delete_field(&self, field_id: FieldId) -> AppResult<()> {
        sqlx::query("DELETE FROM directory_fields WHERE id = $1")
            .bind(field_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|error| store_error("failed to delete directory field", error))?;

        Ok(())
    }
}

fn directory_from_row(row: DirectoryRow) -> AppResult<Directory> {
    Directory::new(
        DirectoryId::from_uuid(row.id),
        row.name,
        row.icon,
        DirectoryType::from_str(row.directory_type.as_str())?,
        row.metadata,
    )
    .map_err(|error| AppError::Internal(format!("persisted directory is invalid: {error}")))
}

fn field_from_row(row: FieldRow) -> AppResult<DirectoryField> {
    let field_id = row.id;
    parse_field_row(row).map_err(|error| {
        AppError::Internal(format!("persisted field '{field_id}' is invalid: {error}"))
    })
}

fn parse_field_row(row: FieldRow) -> AppResult<DirectoryField> {
    DirectoryField::new(
        FieldId::from_uuid(row.id),
        DirectoryId::from_uuid(row.directory_id),
        row.name,
        FieldType::from_str(row.field_type.as_str())?,
        row.relation_id.map(DirectoryId::from_uuid),
        FieldMetadata::from_json(row.metadata)?,
    )
}

#[cfg(test)]
mod tests;
