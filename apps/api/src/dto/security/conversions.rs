use tessera_domain::{AuthorizationDecision, Permission, RolePermission, UserRole};

use super::types::{AuthorizeResponse, PermissionResponse, RoleGrantResponse, RoleResponse};

impl From<Permission> for PermissionResponse {
    fn from(value: Permission) -> Self {
        Self {
            id: value.id(),
            name: value.name().as_str().to_owned(),
            permission_type: value.permission_type().as_str().to_owned(),
            module_id: value.module_id(),
            directory_id: value.directory_id(),
        }
    }
}

impl From<UserRole> for RoleResponse {
    fn from(value: UserRole) -> Self {
        Self {
            id: value.id(),
            name: value.name().as_str().to_owned(),
            is_system: value.is_system(),
        }
    }
}

impl From<RolePermission> for RoleGrantResponse {
    fn from(value: RolePermission) -> Self {
        Self {
            role_id: value.role_id(),
            permission_id: value.permission_id(),
            effective_from: value.effective_from(),
            effective_until: value.effective_until(),
            constraint_data: value.constraint_data().cloned(),
        }
    }
}

impl From<AuthorizationDecision> for AuthorizeResponse {
    fn from(value: AuthorizationDecision) -> Self {
        Self {
            decision: value,
            allowed: value.is_allowed(),
        }
    }
}
