mod common;
mod records;
mod schema;
mod security;
mod tenancy;

pub use common::HealthResponse;
pub use records::{
    CascadingOptionsRequest, CascadingOptionsResponse, CreateRecordRequest, RecordResponse,
    UpdateValueRequest, ValueUpdateResponse,
};
pub use schema::{
    CascadingDependentResponse, CreateDirectoryRequest, DefineFieldRequest, DirectoryResponse,
    FieldResponse, ResolveDependentsRequest, UpdateFieldMetadataRequest,
};
pub use security::{
    AuthorizeRequest, AuthorizeResponse, CreatePermissionRequest, CreateRoleRequest,
    GrantPermissionRequest, PermissionResponse, RoleAssignmentRequest, RoleGrantResponse,
    RoleResponse,
};
pub use tenancy::{
    CompanyDirectoryResponse, CompanyModuleResponse, CompanyResponse, CreateCompanyRequest,
    CreateModuleRequest, EnableDirectoryRequest, EnableModuleRequest, ModuleResponse,
};
