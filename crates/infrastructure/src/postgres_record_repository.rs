use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use tessera_application::{RecordFilter, RecordRepository, StoredValue};
use tessera_core::{
    AppError, AppResult, CompanyDirectoryId, CompanyId, DirectoryId, FieldId, RecordId, ValueId,
};
use tessera_domain::{DirectoryRecord, DirectoryValue};

use crate::postgres_errors::{is_foreign_key_violation, is_unique_violation, store_error};

/// PostgreSQL-backed repository for directory records and their values.
#[derive(Clone)]
pub struct PostgresRecordRepository {
    pool: PgPool,
}

impl PostgresRecordRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RecordRow {
    id: uuid::Uuid,
    company_directory_id: uuid::Uuid,
    metadata: Value,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ValueRow {
    id: uuid::Uuid,
    directory_record_id: uuid::Uuid,
    field_id: uuid::Uuid,
    value: String,
}

#[async_trait]
impl RecordRepository for PostgresRecordRepository {
    async fn create_record(
        &self,
        record: DirectoryRecord,
        values: Vec<DirectoryValue>,
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            store_error("failed to start record create transaction", error)
        })?;

        sqlx::query(
            r#"
            INSERT INTO directory_records (id, company_directory_id, metadata, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(record.id().as_uuid())
        .bind(record.company_directory_id().as_uuid())
        .bind(record.metadata())
        .bind(record.created_at())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            if is_foreign_key_violation(&error) {
                return AppError::NotFound(format!(
                    "company directory '{}' does not exist",
                    record.company_directory_id()
                ));
            }

            store_error("failed to insert directory record", error)
        })?;

        let field_ids: Vec<uuid::Uuid> = values
            .iter()
            .map(|value| value.field_id().as_uuid())
            .collect();
        let bound_fields: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM directory_fields AS fields
            JOIN company_directories AS enablements
                ON enablements.directory_id = fields.directory_id
            WHERE enablements.id = $1 AND fields.id = ANY($2)
            "#,
        )
        .bind(record.company_directory_id().as_uuid())
        .bind(&field_ids)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| store_error("failed to check record value fields", error))?;
        if usize::try_from(bound_fields).unwrap_or_default() != values.len() {
            return Err(AppError::Validation(format!(
                "record '{}' has values for fields outside its directory",
                record.id()
            )));
        }

        for value in &values {
            sqlx::query(
                r#"
                INSERT INTO directory_values (id, directory_record_id, field_id, value)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(value.id().as_uuid())
            .bind(record.id().as_uuid())
            .bind(value.field_id().as_uuid())
            .bind(value.storage_text())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                if is_unique_violation(&error) {
                    return AppError::Validation(format!(
                        "record '{}' has more than one value for field '{}'",
                        record.id(),
                        value.field_id()
                    ));
                }

                store_error("failed to insert directory value", error)
            })?;
        }

        transaction
            .commit()
            .await
            .map_err(|error| store_error("failed to commit record create", error))
    }

    async fn find_record(&self, record_id: RecordId) -> AppResult<Option<DirectoryRecord>> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, company_directory_id, metadata, created_at
            FROM directory_records
            WHERE id = $1
            "#,
        )
        .bind(record_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to find directory record", error))?;

        row.map(record_from_row).transpose()
    }

    async fn list_values(&self, record_ids: &[RecordId]) -> AppResult<Vec<StoredValue>> {
        let record_uuids: Vec<uuid::Uuid> =
            record_ids.iter().map(|record_id| record_id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, ValueRow>(
            r#"
            SELECT directory_values.id, directory_values.directory_record_id,
                directory_values.field_id, directory_values.value
            FROM directory_values
            JOIN directory_records ON directory_records.id = directory_values.directory_record_id
            JOIN directory_fields ON directory_fields.id = directory_values.field_id
            WHERE directory_values.directory_record_id = ANY($1)
            ORDER BY directory_records.position, directory_fields.position
            "#,
        )
        .bind(&record_uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list directory values", error))?;

        Ok(rows
            .into_iter()
            .map(|row| StoredValue {
                value_id: ValueId::from_uuid(row.id),
                record_id: RecordId::from_uuid(row.directory_record_id),
                field_id: FieldId::from_uuid(row.field_id),
                value: row.value,
            })
            .collect())
    }

    async fn update_value(
        &self,
        record_id: RecordId,
        field_id: FieldId,
        value: String,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE directory_values
            SET value = $3
            WHERE directory_record_id = $1 AND field_id = $2
            "#,
        )
        .bind(record_id.as_uuid())
        .bind(field_id.as_uuid())
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|error| store_error("failed to update directory value", error))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "record '{record_id}' has no value for field '{field_id}'"
            )));
        }

        Ok(())
    }

    async fn delete_record(&self, record_id: RecordId) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            store_error("failed to start record delete transaction", error)
        })?;

        sqlx::query("DELETE FROM directory_values WHERE directory_record_id = $1")
            .bind(record_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| store_error("failed to delete record values", error))?;

        sqlx::query("DELETE FROM directory_records WHERE id = $1")
            .bind(record_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| store_error("failed to delete directory record", error))?;

        transaction
            .commit()
            .await
            .map_err(|error| store_error("failed to commit record delete", error))
    }

    async fn list_records(
        &self,
        company_directory_id: CompanyDirectoryId,
        filters: &[RecordFilter],
    ) -> AppResult<Vec<DirectoryRecord>> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "SELECT records.id, records.company_directory_id, records.metadata, records.created_at \
             FROM directory_records AS records WHERE records.company_directory_id = ",
        );
        builder.push_bind(company_directory_id.as_uuid());

        for filter in filters {
            builder.push(
                " AND EXISTS (SELECT 1 FROM directory_values AS filtered \
                 WHERE filtered.directory_record_id = records.id AND filtered.field_id = ",
            );
            builder.push_bind(filter.field_id.as_uuid());
            builder.push(" AND filtered.value = ANY(");
            builder.push_bind(filter.values.clone());
            builder.push("))");
        }

        builder.push(" ORDER BY records.created_at, records.position");

        let rows = builder
            .build_query_as::<RecordRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| store_error("failed to list directory records", error))?;

        rows.into_iter().map(record_from_row).collect()
    }

    async fn record_exists_in_directory(
        &self,
        record_id: RecordId,
        directory_id: DirectoryId,
        company_id: CompanyId,
    ) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM directory_records AS records
                JOIN company_directories AS enablements
                    ON enablements.id = records.company_directory_id
                WHERE records.id = $1
                  AND enablements.directory_id = $2
                  AND enablements.company_id = $3
            )
            "#,
        )
        .bind(record_id.as_uuid())
        .bind(directory_id.as_uuid())
        .bind(company_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| store_error("failed to check record directory", error))
    }
}

fn record_from_row(row: RecordRow) -> AppResult<DirectoryRecord> {
    DirectoryRecord::new(
        RecordId::from_uuid(row.id),
        CompanyDirectoryId::from_uuid(row.company_directory_id),
        row.metadata,
        row.created_at,
    )
    .map_err(|error| {
        AppError::Internal(format!("persisted record '{}' is invalid: {error}", row.id))
    })
}

#[cfg(test)]
mod tests;
