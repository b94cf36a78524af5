use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use tessera_application::CompanyRepository;
use tessera_core::{
    AppError, AppResult, CompanyDirectoryId, CompanyId, CompanyModuleId, DirectoryId, ModuleId,
};
use tessera_domain::{Company, CompanyDirectory, CompanyModule, Module};

use crate::postgres_errors::{is_foreign_key_violation, is_unique_violation, store_error};

/// PostgreSQL-backed repository for companies, modules and enablements.
#[derive(Clone)]
pub struct PostgresCompanyRepository {
    pool: PgPool,
}

impl PostgresCompanyRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct NamedRow {
    id: uuid::Uuid,
    name: String,
}

#[derive(Debug, FromRow)]
struct CompanyModuleRow {
    id: uuid::Uuid,
    company_id: uuid::Uuid,
    module_id: uuid::Uuid,
}

#[derive(Debug, FromRow)]
struct CompanyDirectoryRow {
    id: uuid::Uuid,
    company_id: uuid::Uuid,
    directory_id: uuid::Uuid,
    company_module_id: uuid::Uuid,
}

impl From<CompanyModuleRow> for CompanyModule {
    fn from(row: CompanyModuleRow) -> Self {
        Self {
            id: CompanyModuleId::from_uuid(row.id),
            company_id: CompanyId::from_uuid(row.company_id),
            module_id: ModuleId::from_uuid(row.module_id),
        }
    }
}

impl From<CompanyDirectoryRow> for CompanyDirectory {
    fn from(row: CompanyDirectoryRow) -> Self {
        Self {
            id: CompanyDirectoryId::from_uuid(row.id),
            company_id: CompanyId::from_uuid(row.company_id),
            directory_id: DirectoryId::from_uuid(row.directory_id),
            company_module_id: CompanyModuleId::from_uuid(row.company_module_id),
        }
    }
}

#[async_trait]
impl CompanyRepository for PostgresCompanyRepository {
    async fn save_company(&self, company: Company) -> AppResult<()> {
        sqlx::query("INSERT INTO companies (id, name) VALUES ($1, $2)")
            .bind(company.id().as_uuid())
            .bind(company.name().as_str())
            .execute(&self.pool)
            .await
            .map_err(|error| store_error("failed to save company", error))?;

        Ok(())
    }

    async fn find_company(&self, company_id: CompanyId) -> AppResult<Option<Company>> {
        let row = sqlx::query_as::<_, NamedRow>("SELECT id, name FROM companies WHERE id = $1")
            .bind(company_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| store_error("failed to find company", error))?;

        row.map(|row| Company::new(CompanyId::from_uuid(row.id), row.name))
            .transpose()
    }

    async fn delete_company(&self, company_id: CompanyId) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            store_error("failed to start company delete transaction", error)
        })?;

        sqlx::query(
            r#"
            DELETE FROM directory_values
            WHERE directory_record_id IN (
                SELECT records.id
                FROM directory_records AS records
                JOIN company_directories AS enablements
                    ON enablements.id = records.company_directory_id
                WHERE enablements.company_id = $1
            )
            "#,
        )
        .bind(company_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| store_error("failed to delete company values", error))?;

        sqlx::query(
            r#"
            DELETE FROM directory_records
            WHERE company_directory_id IN (
                SELECT id FROM company_directories WHERE company_id = $1
            )
            "#,
        )
        .bind(company_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| store_error("failed to delete company records", error))?;

        sqlx::query("DELETE FROM company_directories WHERE company_id = $1")
            .bind(company_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| store_error("failed to delete company enablements", error))?;

        // Assignments detach through ON DELETE SET NULL; drop the ones a global twin covers.
        sqlx::query(
            r#"
            DELETE FROM user_role_assignments AS scoped
            WHERE scoped.company_id = $1
                AND EXISTS (
                    SELECT 1
                    FROM user_role_assignments AS global
                    WHERE global.user_id = scoped.user_id
                        AND global.role_id = scoped.role_id
                        AND global.company_id IS NULL
                )
            "#,
        )
        .bind(company_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| store_error("failed to drop duplicate assignments", error))?;

        sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(company_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| store_error("failed to delete company", error))?;

        transaction
            .commit()
            .await
            .map_err(|error| store_error("failed to commit company delete", error))
    }

    async fn save_module(&self, module: Module) -> AppResult<()> {
        sqlx::query("INSERT INTO modules (id, name) VALUES ($1, $2)")
            .bind(module.id().as_uuid())
            .bind(module.name().as_str())
            .execute(&self.pool)
            .await
            .map_err(|error| {
                if is_unique_violation(&error) {
                    return AppError::Conflict(format!(
                        "module '{}' already exists",
                        module.name().as_str()
                    ));
                }

                store_error("failed to save module", error)
            })?;

        Ok(())
    }

    async fn find_module(&self, module_id: ModuleId) -> AppResult<Option<Module>> {
        let row = sqlx::query_as::<_, NamedRow>("SELECT id, name FROM modules WHERE id = $1")
            .bind(module_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| store_error("failed to find module", error))?;

        row.map(|row| Module::new(ModuleId::from_uuid(row.id), row.name))
            .transpose()
    }

    async fn save_company_module(&self, company_module: CompanyModule) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO company_modules (id, company_id, module_id)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(company_module.id.as_uuid())
        .bind(company_module.company_id.as_uuid())
        .bind(company_module.module_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                return AppError::Conflict(format!(
                    "module '{}' is already enabled for company '{}'",
                    company_module.module_id, company_module.company_id
                ));
            }
            if is_foreign_key_violation(&error) {
                return AppError::NotFound("company or module does not exist".to_owned());
            }

            store_error("failed to enable module", error)
        })?;

        Ok(())
    }

    async fn find_company_module(
        &self,
        company_module_id: CompanyModuleId,
    ) -> AppResult<Option<CompanyModule>> {
        let row = sqlx::query_as::<_, CompanyModuleRow>(
            "SELECT id, company_id, module_id FROM company_modules WHERE id = $1",
        )
        .bind(company_module_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to find company module", error))?;

        Ok(row.map(CompanyModule::from))
    }

    async fn save_company_directory(&self, company_directory: CompanyDirectory) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO company_directories (id, company_id, directory_id, company_module_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(company_directory.id.as_uuid())
        .bind(company_directory.company_id.as_uuid())
        .bind(company_directory.directory_id.as_uuid())
        .bind(company_directory.company_module_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                return AppError::Conflict(format!(
                    "directory '{}' is already enabled for company '{}'",
                    company_directory.directory_id, company_directory.company_id
                ));
            }
            if is_foreign_key_violation(&error) {
                return AppError::NotFound(
                    "directory or company module does not exist".to_owned(),
                );
            }

            store_error("failed to enable directory", error)
        })?;

        Ok(())
    }

    async fn find_company_directory(
        &self,
        company_directory_id: CompanyDirectoryId,
    ) -> AppResult<Option<CompanyDirectory>> {
        let row = sqlx::query_as::<_, CompanyDirectoryRow>(
            r#"
            SELECT id, company_id, directory_id, company_module_id
            FROM company_directories
            WHERE id = $1
            "#,
        )
        .bind(company_directory_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to find company directory", error))?;

        Ok(row.map(CompanyDirectory::from))
    }

    async fn find_company_directory_for(
        &self,
        company_id: CompanyId,
        directory_id: DirectoryId,
    ) -> AppResult<Option<CompanyDirectory>> {
        let row = sqlx::query_as::<_, CompanyDirectoryRow>(
            r#"
            SELECT id, company_id, directory_id, company_module_id
            FROM company_directories
            WHERE company_id = $1 AND directory_id = $2
            "#,
        )
        .bind(company_id.as_uuid())
        .bind(directory_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to find company directory", error))?;

        Ok(row.map(CompanyDirectory::from))
    }

    async fn list_company_directories(
        &self,
        company_id: CompanyId,
    ) -> AppResult<Vec<CompanyDirectory>> {
        let rows = sqlx::query_as::<_, CompanyDirectoryRow>(
            r#"
            SELECT
                enablements.id,
                enablements.company_id,
                enablements.directory_id,
                enablements.company_module_id
            FROM company_directories AS enablements
            JOIN directories ON directories.id = enablements.directory_id
            WHERE enablements.company_id = $1
            ORDER BY directories.name
            "#,
        )
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list company directories", error))?;

        Ok(rows.into_iter().map(CompanyDirectory::from).collect())
    }
}
