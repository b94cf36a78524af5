use std::collections::HashMap;

use async_trait::async_trait;
use tessera_application::{AssignedRole, RoleGrant, SecurityRepository};
use tessera_core::{AppError, AppResult, CompanyId, PermissionId, RoleId, UserId};
use tessera_domain::{Permission, RolePermission, UserRole, UserRoleAssignment};
use tokio::sync::RwLock;

/// In-memory adapter for permissions, roles, grants and assignments.
#[derive(Debug, Default)]
pub struct InMemorySecurityRepository {
    permissions: RwLock<HashMap<PermissionId, Permission>>,
    roles: RwLock<HashMap<RoleId, UserRole>>,
    grants: RwLock<HashMap<(RoleId, PermissionId), RolePermission>>,
    assignments: RwLock<Vec<UserRoleAssignment>>,
}

impl InMemorySecurityRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecurityRepository for InMemorySecurityRepository {
    async fn save_permission(&self, permission: Permission) -> AppResult<()> {
        let mut permissions = self.permissions.write().await;
        if permissions
            .values()
            .any(|stored| stored.name() == permission.name())
        {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.name().as_str()
            )));
        }

        permissions.insert(permission.id(), permission);
        Ok(())
    }

    async fn find_permission(
        &self,
        permission_id: PermissionId,
    ) -> AppResult<Option<Permission>> {
        Ok(self.permissions.read().await.get(&permission_id).cloned())
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let mut permissions: Vec<Permission> =
            self.permissions.read().await.values().cloned().collect();
        permissions.sort_by(|left, right| left.name().as_str().cmp(right.name().as_str()));
        Ok(permissions)
    }

    async fn save_role(&self, role: UserRole) -> AppResult<()> {
        let mut roles = self.roles.write().await;
        if roles.values().any(|stored| stored.name() == role.name()) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name().as_str()
            )));
        }

        roles.insert(role.id(), role);
        Ok(())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<UserRole>> {
        Ok(self.roles.read().await.get(&role_id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<UserRole>> {
        Ok(self
            .roles
            .read()
            .await
            .values()
            .find(|role| role.name().as_str() == name)
            .cloned())
    }

    async fn list_roles(&self) -> AppResult<Vec<UserRole>> {
        let mut roles: Vec<UserRole> = self.roles.read().await.values().cloned().collect();
        roles.sort_by(|left, right| left.name().as_str().cmp(right.name().as_str()));
        Ok(roles)
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        self.roles.write().await.remove(&role_id);
        self.grants
            .write()
            .await
            .retain(|(granted_role, _), _| *granted_role != role_id);
        self.assignments
            .write()
            .await
            .retain(|assignment| assignment.role_id != role_id);
        Ok(())
    }

    async fn find_grant(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<Option<RolePermission>> {
        Ok(self
            .grants
            .read()
            .await
            .get(&(role_id, permission_id))
            .cloned())
    }

    async fn insert_grant(&self, grant: RolePermission) -> AppResult<()> {
        let mut grants = self.grants.write().await;
        let key = (grant.role_id(), grant.permission_id());
        if grants.contains_key(&key) {
            return Err(AppError::DuplicateGrant(format!(
                "role '{}' already holds permission '{}'",
                key.0, key.1
            )));
        }

        grants.insert(key, grant);
        Ok(())
    }

    async fn replace_grant(&self, grant: RolePermission) -> AppResult<()> {
        self.grants
            .write()
            .await
            .insert((grant.role_id(), grant.permission_id()), grant);
        Ok(())
    }

    async fn delete_grant(&self, role_id: RoleId, permission_id: PermissionId) -> AppResult<()> {
        self.grants.write().await.remove(&(role_id, permission_id));
        Ok(())
    }

    async fn list_grants(&self, role_id: RoleId) -> AppResult<Vec<RolePermission>> {
        let mut grants: Vec<RolePermission> = self
            .grants
            .read()
            .await
            .values()
            .filter(|grant| grant.role_id() == role_id)
            .cloned()
            .collect();
        grants.sort_by_key(RolePermission::permission_id);
        Ok(grants)
    }

    async fn list_role_grants(&self, role_ids: &[RoleId]) -> AppResult<Vec<RoleGrant>> {
        let grants = self.grants.read().await;
        let permissions = self.permissions.read().await;

        Ok(grants
            .values()
            .filter(|grant| role_ids.contains(&grant.role_id()))
            .filter_map(|grant| {
                permissions
                    .get(&grant.permission_id())
                    .map(|permission| RoleGrant {
                        grant: grant.clone(),
                        permission: permission.clone(),
                    })
            })
            .collect())
    }

    async fn assign_role(&self, assignment: UserRoleAssignment) -> AppResult<()> {
        if !self.roles.read().await.contains_key(&assignment.role_id) {
            return Err(AppError::NotFound(format!(
                "role '{}' does not exist",
                assignment.role_id
            )));
        }

        let mut assignments = self.assignments.write().await;
        if !assignments.contains(&assignment) {
            assignments.push(assignment);
        }
        Ok(())
    }

    async fn unassign_role(&self, assignment: UserRoleAssignment) -> AppResult<()> {
        self.assignments
            .write()
            .await
            .retain(|stored| *stored != assignment);
        Ok(())
    }

    async fn list_assigned_roles(&self, user_id: UserId) -> AppResult<Vec<AssignedRole>> {
        let assignments = self.assignments.read().await;
        let roles = self.roles.read().await;

        Ok(assignments
            .iter()
            .filter(|assignment| assignment.user_id == user_id)
            .filter_map(|assignment| {
                roles.get(&assignment.role_id).map(|role| AssignedRole {
                    company_id: assignment.company_id,
                    role: role.clone(),
                })
            })
            .collect())
    }

    async fn detach_company_assignments(&self, company_id: CompanyId) -> AppResult<()> {
        let mut assignments = self.assignments.write().await;
        let mut detached: Vec<UserRoleAssignment> = Vec::with_capacity(assignments.len());
        for assignment in assignments.drain(..) {
            let assignment = if assignment.company_id == Some(company_id) {
                UserRoleAssignment {
                    company_id: None,
                    ..assignment
                }
            } else {
                assignment
            };
            if !detached.contains(&assignment) {
                detached.push(assignment);
            }
        }

        *assignments = detached;
        Ok(())
    }
}
