//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_ports;
mod authorization_service;
mod cascading_resolver;
mod company_service;
mod directory_schema_service;
mod permission_service;
mod record_ports;
mod record_service;
mod schema_ports;
mod security_ports;
mod tenancy_ports;

#[cfg(test)]
mod test_support;

pub use audit_ports::{AuditEvent, AuditRepository};
pub use authorization_service::{AuthorizationService, Authorizer, FieldAccess};
pub use cascading_resolver::{CascadingDependent, CascadingFilter, CascadingResolver, FilterBinding};
pub use company_service::CompanyService;
pub use directory_schema_service::DirectorySchemaService;
pub use permission_service::PermissionService;
pub use record_ports::{CreateRecordInput, RecordFilter, RecordRepository, StoredValue};
pub use record_service::{CascadingOptions, RecordService, RecordView, ValueUpdate};
pub use schema_ports::{CreateDirectoryInput, DefineFieldInput, DirectoryRepository};
pub use security_ports::{
    AssignedRole, CreatePermissionInput, GrantPermissionInput, RoleGrant, SecurityRepository,
};
pub use tenancy_ports::{CompanyRepository, EnableDirectoryInput};
