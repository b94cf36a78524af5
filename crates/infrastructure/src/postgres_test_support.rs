use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tessera_application::{CompanyRepository, DirectoryRepository};
use tessera_core::{
    CompanyDirectoryId, CompanyId, CompanyModuleId, DirectoryId, FieldId, ModuleId,
};
use tessera_domain::{
    Company, CompanyDirectory, CompanyModule, Directory, DirectoryField, DirectoryType,
    FieldMetadata, FieldType, Module,
};

use crate::{MIGRATOR, PostgresCompanyRepository, PostgresDirectoryRepository};

/// Connects to `DATABASE_URL` and migrates it; `None` skips database tests.
pub(crate) async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres tests: {error}");
    }

    Some(pool)
}

/// Directory with one `status` field enabled for a fresh company.
pub(crate) struct SeededDirectory {
    pub(crate) directory: Directory,
    pub(crate) status: DirectoryField,
    pub(crate) enablement: CompanyDirectory,
}

pub(crate) fn unique_name(prefix: &str) -> String {
    format!("{prefix} {}", uuid::Uuid::new_v4())
}

pub(crate) async fn seed_directory(pool: &PgPool, prefix: &str) -> SeededDirectory {
    let directories = PostgresDirectoryRepository::new(pool.clone());
    let companies = PostgresCompanyRepository::new(pool.clone());

    let directory = Directory::new(
        DirectoryId::new(),
        unique_name(prefix),
        None,
        DirectoryType::Company,
        Value::Null,
    )
    .unwrap_or_else(|_| unreachable!());
    assert!(directories.save_directory(directory.clone()).await.is_ok());

    let status = DirectoryField::new(
        FieldId::new(),
        directory.id(),
        "status",
        FieldType::String,
        None,
        FieldMetadata::default(),
    )
    .unwrap_or_else(|_| unreachable!());
    assert!(directories.save_field(status.clone()).await.is_ok());

    let company = Company::new(CompanyId::new(), "Acme").unwrap_or_else(|_| unreachable!());
    assert!(companies.save_company(company.clone()).await.is_ok());
    let module =
        Module::new(ModuleId::new(), unique_name("module")).unwrap_or_else(|_| unreachable!());
    assert!(companies.save_module(module.clone()).await.is_ok());
    let company_module = CompanyModule {
        id: CompanyModuleId::new(),
        company_id: company.id(),
        module_id: module.id(),
    };
    assert!(companies.save_company_module(company_module).await.is_ok());
    let enablement = CompanyDirectory {
        id: CompanyDirectoryId::new(),
        company_id: company.id(),
        directory_id: directory.id(),
        company_module_id: company_module.id,
    };
    assert!(companies.save_company_directory(enablement).await.is_ok());

    SeededDirectory {
        directory,
        status,
        enablement,
    }
}
