//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_audit_repository;
mod in_memory_directory_store;
mod in_memory_security_repository;
mod postgres_audit_repository;
mod postgres_company_repository;
mod postgres_directory_repository;
mod postgres_errors;
mod postgres_record_repository;
mod postgres_security_repository;

#[cfg(test)]
mod postgres_test_support;

pub use in_memory_audit_repository::InMemoryAuditRepository;
pub use in_memory_directory_store::InMemoryDirectoryStore;
pub use in_memory_security_repository::InMemorySecurityRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_company_repository::PostgresCompanyRepository;
pub use postgres_directory_repository::PostgresDirectoryRepository;
pub use postgres_record_repository::PostgresRecordRepository;
pub use postgres_security_repository::PostgresSecurityRepository;

/// Embedded schema migrations for the PostgreSQL adapters.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
