use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tessera_core::{AppResult, CompanyId, DirectoryId, ModuleId, PermissionId, RoleId, UserId};
use tessera_domain::{Permission, PermissionType, RolePermission, UserRole, UserRoleAssignment};

/// Input payload for permission creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePermissionInput {
    /// Unique permission name.
    pub name: String,
    /// Capability class.
    pub permission_type: PermissionType,
    /// Optional module scope.
    pub module_id: Option<ModuleId>,
    /// Optional directory scope.
    pub directory_id: Option<DirectoryId>,
}

/// Input payload for granting a permission to a role.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantPermissionInput {
    /// Grantee role.
    pub role_id: RoleId,
    /// Granted permission.
    pub permission_id: PermissionId,
    /// Inclusive start of validity.
    pub effective_from: Option<DateTime<Utc>>,
    /// Inclusive end of validity.
    pub effective_until: Option<DateTime<Utc>>,
    /// Extra constraints such as field restrictions.
    pub constraint_data: Option<Value>,
}

/// Role held by a user through one assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedRole {
    /// Company scope of the assignment.
    pub company_id: Option<CompanyId>,
    /// Assigned role.
    pub role: UserRole,
}

/// Grant joined with the permission it refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleGrant {
    /// Grant row.
    pub grant: RolePermission,
    /// Granted permission.
    pub permission: Permission,
}

/// Repository port for permissions, roles, grants and assignments.
#[async_trait]
pub trait SecurityRepository: Send + Sync {
    /// Saves a new permission; names are unique.
    async fn save_permission(&self, permission: Permission) -> AppResult<()>;

    /// Finds a permission by identifier.
    async fn find_permission(&self, permission_id: PermissionId)
    -> AppResult<Option<Permission>>;

    /// Lists every permission ordered by name.
    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;

    /// Saves a new role; names are unique.
    async fn save_role(&self, role: UserRole) -> AppResult<()>;

    /// Finds a role by identifier.
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<UserRole>>;

    /// Finds a role by name.
    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<UserRole>>;

    /// Lists every role ordered by name.
    async fn list_roles(&self) -> AppResult<Vec<UserRole>>;

    /// Deletes a role with its grants and assignments.
    async fn delete_role(&self, role_id: RoleId) -> AppResult<()>;

    /// Finds the grant for a role/permission pair.
    async fn find_grant(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<Option<RolePermission>>;

    /// Inserts a grant; fails with `DuplicateGrant` when the pair already exists.
    async fn insert_grant(&self, grant: RolePermission) -> AppResult<()>;

    /// Replaces the grant stored for the same pair.
    async fn replace_grant(&self, grant: RolePermission) -> AppResult<()>;

    /// Deletes the grant for a pair; absent grants are ignored.
    async fn delete_grant(&self, role_id: RoleId, permission_id: PermissionId) -> AppResult<()>;

    /// Lists grants held by a role.
    async fn list_grants(&self, role_id: RoleId) -> AppResult<Vec<RolePermission>>;

    /// Lists grants held by any of the roles, joined with their permissions.
    async fn list_role_grants(&self, role_ids: &[RoleId]) -> AppResult<Vec<RoleGrant>>;

    /// Stores an assignment; existing identical assignments are kept.
    async fn assign_role(&self, assignment: UserRoleAssignment) -> AppResult<()>;

    /// Removes an assignment; absent assignments are ignored.
    async fn unassign_role(&self, assignment: UserRoleAssignment) -> AppResult<()>;

    /// Lists roles assigned to a user across all companies.
    async fn list_assigned_roles(&self, user_id: UserId) -> AppResult<Vec<AssignedRole>>;

    /// Clears the company of every assignment made inside `company_id`.
    async fn detach_company_assignments(&self, company_id: CompanyId) -> AppResult<()>;
}
