mod conversions;
mod types;

pub use types::{
    AuthorizeRequest, AuthorizeResponse, CreatePermissionRequest, CreateRoleRequest,
    GrantPermissionRequest, PermissionResponse, RoleAssignmentRequest, RoleGrantResponse,
    RoleResponse,
};
