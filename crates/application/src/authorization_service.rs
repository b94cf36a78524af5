use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tessera_core::{AppError, AppResult, RoleId, UserId, UserIdentity};
use tessera_domain::{AuthorizationDecision, PermissionType, ResourceScope, UserRoleAssignment};
use tracing::debug;

use crate::security_ports::{AssignedRole, RoleGrant, SecurityRepository};

/// Attribute-level access resolved alongside an allow decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldAccess {
    /// Every field of the directory.
    All,
    /// Only the named fields.
    Only(BTreeSet<String>),
}

impl FieldAccess {
    /// Returns whether the named field is accessible.
    #[must_use]
    pub fn permits(&self, field_name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(fields) => fields.contains(field_name),
        }
    }
}

/// Which role assignments count towards a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reach {
    AnyCompany,
    GlobalOnly,
}

/// Snapshot of one user's roles and grants evaluated at a fixed instant.
///
/// Evaluating many resources against one snapshot costs a single store round trip.
#[derive(Debug, Clone)]
pub struct Authorizer {
    user_id: UserId,
    at: DateTime<Utc>,
    assigned_roles: Vec<AssignedRole>,
    grants: Vec<RoleGrant>,
}

impl Authorizer {
    /// Builds a snapshot from already loaded assignments and grants.
    #[must_use]
    pub fn new(
        user_id: UserId,
        at: DateTime<Utc>,
        assigned_roles: Vec<AssignedRole>,
        grants: Vec<RoleGrant>,
    ) -> Self {
        Self {
            user_id,
            at,
            assigned_roles,
            grants,
        }
    }

    /// Returns whether the user holds the super admin role through any assignment.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.counted_roles(Reach::AnyCompany)
            .any(|assigned| assigned.role.is_super_admin())
    }

    /// Returns whether the user holds the super admin role through a global assignment.
    #[must_use]
    pub fn is_global_super_admin(&self) -> bool {
        self.counted_roles(Reach::GlobalOnly)
            .any(|assigned| assigned.role.is_super_admin())
    }

    /// Decides whether `action` on `resource` is allowed. Absence of a grant denies.
    #[must_use]
    pub fn decide(
        &self,
        action: PermissionType,
        resource: &ResourceScope,
    ) -> AuthorizationDecision {
        if self.field_access(action, resource).is_some() {
            AuthorizationDecision::Allow
        } else {
            AuthorizationDecision::Deny
        }
    }

    /// Returns field-level access when `action` is allowed, `None` when denied.
    ///
    /// Any matching grant without field restrictions yields full access; otherwise the
    /// restrictions of all matching grants are united.
    #[must_use]
    pub fn field_access(
        &self,
        action: PermissionType,
        resource: &ResourceScope,
    ) -> Option<FieldAccess> {
        self.resolve(action, resource, Reach::AnyCompany)
    }

    /// Decides `action` on `resource` counting only assignments made outside any company.
    #[must_use]
    pub fn decide_global(
        &self,
        action: PermissionType,
        resource: &ResourceScope,
    ) -> AuthorizationDecision {
        if self.resolve(action, resource, Reach::GlobalOnly).is_some() {
            AuthorizationDecision::Allow
        } else {
            AuthorizationDecision::Deny
        }
    }

    fn resolve(
        &self,
        action: PermissionType,
        resource: &ResourceScope,
        reach: Reach,
    ) -> Option<FieldAccess> {
        if self
            .counted_roles(reach)
            .any(|assigned| assigned.role.is_super_admin())
        {
            return Some(FieldAccess::All);
        }

        let applicable_roles = self.applicable_roles(resource, reach);
        let mut matched = false;
        let mut restricted_fields = BTreeSet::new();

        for role_grant in self.grants.iter().filter(|role_grant| {
            applicable_roles.contains(&role_grant.grant.role_id())
                && role_grant.permission.allows(action, resource)
                && role_grant.grant.is_active_at(self.at)
        }) {
            matched = true;
            match role_grant.grant.field_restrictions() {
                Some(fields) => restricted_fields.extend(fields),
                None => return Some(FieldAccess::All),
            }
        }

        matched.then_some(FieldAccess::Only(restricted_fields))
    }

    fn counted_roles(&self, reach: Reach) -> impl Iterator<Item = &AssignedRole> {
        self.assigned_roles
            .iter()
            .filter(move |assigned| reach == Reach::AnyCompany || assigned.company_id.is_none())
    }

    fn applicable_roles(&self, resource: &ResourceScope, reach: Reach) -> HashSet<RoleId> {
        self.counted_roles(reach)
            .filter(|assigned| {
                UserRoleAssignment {
                    user_id: self.user_id,
                    role_id: assigned.role.id(),
                    company_id: assigned.company_id,
                }
                .applies_to(resource)
            })
            .map(|assigned| assigned.role.id())
            .collect()
    }
}

/// Application service evaluating role grants against resources.
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn SecurityRepository>,
}

impl AuthorizationService {
    /// Creates a new authorization service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn SecurityRepository>) -> Self {
        Self { repository }
    }

    /// Loads the roles and grants of a user into an evaluation snapshot.
    pub async fn authorizer(&self, user_id: UserId, at: DateTime<Utc>) -> AppResult<Authorizer> {
        let assigned_roles = self.repository.list_assigned_roles(user_id).await?;

        let mut role_ids: Vec<RoleId> = assigned_roles
            .iter()
            .map(|assigned| assigned.role.id())
            .collect();
        role_ids.sort();
        role_ids.dedup();

        let grants = if role_ids.is_empty()
            || assigned_roles
                .iter()
                .any(|assigned| assigned.role.is_super_admin())
        {
            Vec::new()
        } else {
            self.repository.list_role_grants(&role_ids).await?
        };

        Ok(Authorizer::new(user_id, at, assigned_roles, grants))
    }

    /// Decides whether `user_id` may perform `action` on `resource` at `at`.
    pub async fn authorize(
        &self,
        user_id: UserId,
        action: PermissionType,
        resource: &ResourceScope,
        at: DateTime<Utc>,
    ) -> AppResult<AuthorizationDecision> {
        Ok(self.authorizer(user_id, at).await?.decide(action, resource))
    }

    /// Ensures the actor may perform `action` on `resource` now.
    pub async fn require(
        &self,
        actor: &UserIdentity,
        action: PermissionType,
        resource: &ResourceScope,
    ) -> AppResult<()> {
        self.require_field_access(actor, action, resource)
            .await
            .map(|_| ())
    }

    /// Ensures the actor may perform `action` on `resource` through a global assignment.
    pub async fn require_global(
        &self,
        actor: &UserIdentity,
        action: PermissionType,
        resource: &ResourceScope,
    ) -> AppResult<()> {
        let authorizer = self.authorizer(actor.user_id(), Utc::now()).await?;

        if authorizer.decide_global(action, resource).is_allowed() {
            return Ok(());
        }

        debug!(
            user_id = %actor.user_id(),
            action = action.as_str(),
            directory_id = ?resource.directory_id,
            "global authorization denied"
        );
        Err(AppError::Forbidden(format!(
            "user '{}' needs a global {} grant for this resource",
            actor.user_id(),
            action.as_str()
        )))
    }

    /// Ensures the actor holds the super admin role through a global assignment.
    pub async fn require_super_admin(&self, actor: &UserIdentity) -> AppResult<()> {
        let authorizer = self.authorizer(actor.user_id(), Utc::now()).await?;

        if authorizer.is_global_super_admin() {
            return Ok(());
        }

        debug!(user_id = %actor.user_id(), "super admin required");
        Err(AppError::Forbidden(format!(
            "user '{}' is not a super admin",
            actor.user_id()
        )))
    }

    /// Ensures the actor may perform `action` on `resource` now and returns field access.
    pub async fn require_field_access(
        &self,
        actor: &UserIdentity,
        action: PermissionType,
        resource: &ResourceScope,
    ) -> AppResult<FieldAccess> {
        let authorizer = self.authorizer(actor.user_id(), Utc::now()).await?;

        authorizer.field_access(action, resource).ok_or_else(|| {
            debug!(
                user_id = %actor.user_id(),
                action = action.as_str(),
                company_id = ?resource.company_id,
                module_id = ?resource.module_id,
                directory_id = ?resource.directory_id,
                "authorization denied"
            );
            AppError::Forbidden(format!(
                "user '{}' is not allowed to {} this resource",
                actor.user_id(),
                action.as_str()
            ))
        })
    }
}

#[cfg(test)]
mod tests;
