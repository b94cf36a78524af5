use std::sync::Arc;

use chrono::Utc;
use tessera_core::{AppError, AppResult, PermissionId, RoleId, UserId, UserIdentity};
use tessera_domain::{
    AuditAction, Permission, PermissionType, ResourceScope, RolePermission, SUPER_ADMIN_ROLE,
    UserRole, UserRoleAssignment,
};
use tracing::{info, warn};

use crate::audit_ports::{AuditEvent, AuditRepository};
use crate::authorization_service::AuthorizationService;
use crate::security_ports::{CreatePermissionInput, GrantPermissionInput, SecurityRepository};

/// Application service for permissions, roles, grants and role assignments.
#[derive(Clone)]
pub struct PermissionService {
    repository: Arc<dyn SecurityRepository>,
    authorization_service: AuthorizationService,
    audit_repository: Arc<dyn AuditRepository>,
}

impl PermissionService {
    /// Creates a new permission service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn SecurityRepository>,
        authorization_service: AuthorizationService,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            repository,
            authorization_service,
            audit_repository,
        }
    }

    /// Creates the system super admin role when missing and assigns it globally to `user_id`.
    ///
    /// Runs without an actor; used once at start-up.
    pub async fn bootstrap_super_admin(&self, user_id: UserId) -> AppResult<UserRole> {
        let role = match self.repository.find_role_by_name(SUPER_ADMIN_ROLE).await? {
            Some(role) => role,
            None => {
                let role = UserRole::new(RoleId::new(), SUPER_ADMIN_ROLE, true)?;
                self.repository.save_role(role.clone()).await?;
                role
            }
        };

        self.repository
            .assign_role(UserRoleAssignment {
                user_id,
                role_id: role.id(),
                company_id: None,
            })
            .await?;

        info!(user_id = %user_id, "super admin bootstrapped");
        Ok(role)
    }

    /// Creates a permission; names are unique.
    pub async fn create_permission(
        &self,
        actor: &UserIdentity,
        input: CreatePermissionInput,
    ) -> AppResult<Permission> {
        self.require_admin(actor).await?;

        let permission = Permission::new(
            PermissionId::new(),
            input.name,
            input.permission_type,
            input.module_id,
            input.directory_id,
        )?;
        self.repository.save_permission(permission.clone()).await?;

        self.audit(
            actor,
            AuditAction::PermissionCreated,
            "permission",
            permission.id().to_string(),
            format!(
                "created {} permission '{}'",
                permission.permission_type().as_str(),
                permission.name().as_str()
            ),
        )
        .await?;

        Ok(permission)
    }

    /// Lists every permission.
    pub async fn list_permissions(&self, actor: &UserIdentity) -> AppResult<Vec<Permission>> {
        self.require_admin(actor).await?;
        self.repository.list_permissions().await
    }

    /// Creates a non-system role.
    pub async fn create_role(
        &self,
        actor: &UserIdentity,
        name: impl Into<String>,
    ) -> AppResult<UserRole> {
        self.require_admin(actor).await?;

        let role = UserRole::new(RoleId::new(), name, false)?;
        if role.is_super_admin() {
            return Err(AppError::Conflict(format!(
                "role name '{SUPER_ADMIN_ROLE}' is reserved"
            )));
        }
        self.repository.save_role(role.clone()).await?;

        self.audit(
            actor,
            AuditAction::RoleCreated,
            "user_role",
            role.id().to_string(),
            format!("created role '{}'", role.name().as_str()),
        )
        .await?;

        Ok(role)
    }

    /// Lists every role.
    pub async fn list_roles(&self, actor: &UserIdentity) -> AppResult<Vec<UserRole>> {
        self.require_admin(actor).await?;
        self.repository.list_roles().await
    }

    /// Deletes a role with its grants and assignments. System roles are protected.
    pub async fn delete_role(&self, actor: &UserIdentity, role_id: RoleId) -> AppResult<()> {
        self.require_admin(actor).await?;

        let role = self.require_role(role_id).await?;
        if role.is_system() {
            return Err(AppError::Conflict(format!(
                "system role '{}' cannot be deleted",
                role.name().as_str()
            )));
        }

        self.repository.delete_role(role_id).await?;
        self.audit(
            actor,
            AuditAction::RoleDeleted,
            "user_role",
            role_id.to_string(),
            format!("deleted role '{}'", role.name().as_str()),
        )
        .await
    }

    /// Grants a permission to a role.
    ///
    /// An existing grant for the pair fails with `DuplicateGrant` unless its window has lapsed,
    /// in which case it is replaced.
    pub async fn grant(
        &self,
        actor: &UserIdentity,
        input: GrantPermissionInput,
    ) -> AppResult<RolePermission> {
        self.require_admin(actor).await?;
        self.require_role(input.role_id).await?;
        let permission = self
            .repository
            .find_permission(input.permission_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "permission '{}' does not exist",
                    input.permission_id
                ))
            })?;

        let grant = RolePermission::new(
            input.role_id,
            input.permission_id,
            input.effective_from,
            input.effective_until,
            input.constraint_data,
        )?;

        match self
            .repository
            .find_grant(input.role_id, input.permission_id)
            .await?
        {
            Some(existing) if existing.has_lapsed_at(Utc::now()) => {
                self.repository.replace_grant(grant.clone()).await?;
            }
            Some(_) => {
                warn!(
                    role_id = %input.role_id,
                    permission_id = %input.permission_id,
                    "grant rejected: pair already holds a live grant"
                );
                return Err(AppError::DuplicateGrant(format!(
                    "role '{}' already holds permission '{}'",
                    input.role_id,
                    permission.name().as_str()
                )));
            }
            None => self.repository.insert_grant(grant.clone()).await?,
        }

        self.audit(
            actor,
            AuditAction::PermissionGranted,
            "role_permission",
            format!("{}:{}", input.role_id, input.permission_id),
            format!("granted permission '{}'", permission.name().as_str()),
        )
        .await?;

        Ok(grant)
    }

    /// Revokes a grant; absent grants are ignored.
    pub async fn revoke(
        &self,
        actor: &UserIdentity,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.require_admin(actor).await?;

        self.repository.delete_grant(role_id, permission_id).await?;
        self.audit(
            actor,
            AuditAction::PermissionRevoked,
            "role_permission",
            format!("{role_id}:{permission_id}"),
            "revoked grant".to_owned(),
        )
        .await
    }

    /// Lists grants held by a role.
    pub async fn list_grants(
        &self,
        actor: &UserIdentity,
        role_id: RoleId,
    ) -> AppResult<Vec<RolePermission>> {
        self.require_admin(actor).await?;
        self.require_role(role_id).await?;
        self.repository.list_grants(role_id).await
    }

    /// Assigns a role to a user, globally or inside one company.
    ///
    /// System roles are assigned and removed only by a global super admin.
    pub async fn assign_role(
        &self,
        actor: &UserIdentity,
        assignment: UserRoleAssignment,
    ) -> AppResult<()> {
        self.require_admin(actor).await?;
        let role = self.require_role(assignment.role_id).await?;
        if role.is_system() {
            self.authorization_service.require_super_admin(actor).await?;
        }

        self.repository.assign_role(assignment).await?;
        self.audit(
            actor,
            AuditAction::RoleAssigned,
            "user_role_assignment",
            assignment.user_id.to_string(),
            format!("assigned role '{}'", role.name().as_str()),
        )
        .await
    }

    /// Removes a role assignment; absent assignments are ignored.
    pub async fn unassign_role(
        &self,
        actor: &UserIdentity,
        assignment: UserRoleAssignment,
    ) -> AppResult<()> {
        self.require_admin(actor).await?;
        if let Some(role) = self.repository.find_role(assignment.role_id).await?
            && role.is_system()
        {
            self.authorization_service.require_super_admin(actor).await?;
        }

        self.repository.unassign_role(assignment).await?;
        self.audit(
            actor,
            AuditAction::RoleUnassigned,
            "user_role_assignment",
            assignment.user_id.to_string(),
            format!("unassigned role '{}'", assignment.role_id),
        )
        .await
    }

    async fn require_admin(&self, actor: &UserIdentity) -> AppResult<()> {
        self.authorization_service
            .require_global(actor, PermissionType::Manage, &ResourceScope::global())
            .await
    }

    async fn require_role(&self, role_id: RoleId) -> AppResult<UserRole> {
        self.repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }

    async fn audit(
        &self,
        actor: &UserIdentity,
        action: AuditAction,
        resource_type: &str,
        resource_id: String,
        detail: String,
    ) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                company_id: actor.company_id(),
                user_id: actor.user_id(),
                action,
                resource_type: resource_type.to_owned(),
                resource_id,
                detail: Some(detail),
            })
            .await
    }
}
