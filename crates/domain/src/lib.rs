//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod directory;
mod field;
mod record;
mod security;
mod tenancy;
mod value;

pub use directory::{Directory, DirectoryType};
pub use field::{DirectoryField, FieldMetadata, FieldType, order_fields};
pub use record::{DirectoryRecord, DirectoryValue};
pub use security::{
    AuditAction, AuthorizationDecision, Permission, PermissionType, ResourceScope,
    RolePermission, SUPER_ADMIN_ROLE, UserRole, UserRoleAssignment,
};
pub use tenancy::{Company, CompanyDirectory, CompanyModule, Module};
pub use value::FieldValue;
