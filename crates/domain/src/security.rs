use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_core::{
    AppError, AppResult, CompanyId, DirectoryId, ModuleId, NonEmptyString, PermissionId, RoleId,
    UserId,
};

/// Name of the role that bypasses every permission check.
pub const SUPER_ADMIN_ROLE: &str = "super_admin";

/// Capability class of a permission and the action requested from the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    /// Read records or schema.
    Read,
    /// Create, update or delete records.
    Write,
    /// Administer schema and grants; implies read and write.
    Manage,
}

impl PermissionType {
    /// Returns a stable storage value for this permission type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Manage => "manage",
        }
    }

    /// Returns whether a permission of this type allows `action`.
    #[must_use]
    pub fn satisfies(self, action: PermissionType) -> bool {
        self == action || self == Self::Manage
    }
}

impl FromStr for PermissionType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "manage" => Ok(Self::Manage),
            _ => Err(AppError::Validation(format!(
                "unknown permission type '{value}'"
            ))),
        }
    }
}

/// Target of an authorization request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceScope {
    /// Company owning the resource, when tenant-scoped.
    pub company_id: Option<CompanyId>,
    /// Module the resource belongs to.
    pub module_id: Option<ModuleId>,
    /// Directory the resource belongs to.
    pub directory_id: Option<DirectoryId>,
}

impl ResourceScope {
    /// Returns the platform-wide scope.
    #[must_use]
    pub fn global() -> Self {
        Self::default()
    }

    /// Returns a scope covering one directory in any company.
    #[must_use]
    pub fn directory(directory_id: DirectoryId) -> Self {
        Self {
            directory_id: Some(directory_id),
            ..Self::default()
        }
    }
}

/// Grantable capability, optionally scoped to a module or a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    id: PermissionId,
    name: NonEmptyString,
    permission_type: PermissionType,
    module_id: Option<ModuleId>,
    directory_id: Option<DirectoryId>,
}

impl Permission {
    /// Creates a validated permission.
    pub fn new(
        id: PermissionId,
        name: impl Into<String>,
        permission_type: PermissionType,
        module_id: Option<ModuleId>,
        directory_id: Option<DirectoryId>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            permission_type,
            module_id,
            directory_id,
        })
    }

    /// Returns the permission identifier.
    #[must_use]
    pub fn id(&self) -> PermissionId {
        self.id
    }

    /// Returns the unique permission name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the capability class.
    #[must_use]
    pub fn permission_type(&self) -> PermissionType {
        self.permission_type
    }

    /// Returns the module scope.
    #[must_use]
    pub fn module_id(&self) -> Option<ModuleId> {
        self.module_id
    }

    /// Returns the directory scope.
    #[must_use]
    pub fn directory_id(&self) -> Option<DirectoryId> {
        self.directory_id
    }

    /// Returns whether the permission applies to `resource`.
    ///
    /// An unset scope component matches anything.
    #[must_use]
    pub fn matches_scope(&self, resource: &ResourceScope) -> bool {
        let module_matches = self
            .module_id
            .is_none_or(|module_id| resource.module_id == Some(module_id));
        let directory_matches = self
            .directory_id
            .is_none_or(|directory_id| resource.directory_id == Some(directory_id));

        module_matches && directory_matches
    }

    /// Returns whether the permission covers `action` on `resource`.
    #[must_use]
    pub fn allows(&self, action: PermissionType, resource: &ResourceScope) -> bool {
        self.permission_type.satisfies(action) && self.matches_scope(resource)
    }
}

/// Named role; system roles are protected from deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    id: RoleId,
    name: NonEmptyString,
    is_system: bool,
}

impl UserRole {
    /// Creates a validated role.
    pub fn new(id: RoleId, name: impl Into<String>, is_system: bool) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            is_system,
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the unique role name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns whether the role is system-managed.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.is_system
    }

    /// Returns whether the role bypasses permission checks.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.name.as_str() == SUPER_ADMIN_ROLE
    }
}

/// Grant of a permission to a role, optionally time-bounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolePermission {
    role_id: RoleId,
    permission_id: PermissionId,
    effective_from: Option<DateTime<Utc>>,
    effective_until: Option<DateTime<Utc>>,
    constraint_data: Option<Value>,
}

impl RolePermission {
    /// Creates a validated grant.
    ///
    /// `constraint_data.fields`, when present, must list field names.
    pub fn new(
        role_id: RoleId,
        permission_id: PermissionId,
        effective_from: Option<DateTime<Utc>>,
        effective_until: Option<DateTime<Utc>>,
        constraint_data: Option<Value>,
    ) -> AppResult<Self> {
        if let (Some(from), Some(until)) = (effective_from, effective_until)
            && from > until
        {
            return Err(AppError::Validation(
                "effective_from must not be later than effective_until".to_owned(),
            ));
        }

        let constraint_data = constraint_data.filter(|value| !value.is_null());
        if let Some(data) = &constraint_data {
            let Some(object) = data.as_object() else {
                return Err(AppError::Validation(
                    "constraint_data must be a JSON object".to_owned(),
                ));
            };

            if let Some(fields) = object.get("fields") {
                let all_names = fields
                    .as_array()
                    .is_some_and(|items| items.iter().all(Value::is_string));
                if !all_names {
                    return Err(AppError::Validation(
                        "constraint_data.fields must be an array of field names".to_owned(),
                    ));
                }
            }
        }

        Ok(Self {
            role_id,
            permission_id,
            effective_from,
            effective_until,
            constraint_data,
        })
    }

    /// Returns the grantee role.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns the granted permission.
    #[must_use]
    pub fn permission_id(&self) -> PermissionId {
        self.permission_id
    }

    /// Returns the inclusive start of the validity window.
    #[must_use]
    pub fn effective_from(&self) -> Option<DateTime<Utc>> {
        self.effective_from
    }

    /// Returns the inclusive end of the validity window.
    #[must_use]
    pub fn effective_until(&self) -> Option<DateTime<Utc>> {
        self.effective_until
    }

    /// Returns extra constraints attached to the grant.
    #[must_use]
    pub fn constraint_data(&self) -> Option<&Value> {
        self.constraint_data.as_ref()
    }

    /// Returns whether the grant is in force at `at`; both bounds are inclusive.
    #[must_use]
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.effective_from.is_none_or(|from| at >= from)
            && self.effective_until.is_none_or(|until| at <= until)
    }

    /// Returns whether the validity window ended before `at`.
    #[must_use]
    pub fn has_lapsed_at(&self, at: DateTime<Utc>) -> bool {
        self.effective_until.is_some_and(|until| at > until)
    }

    /// Returns the field names this grant is restricted to, if any.
    #[must_use]
    pub fn field_restrictions(&self) -> Option<BTreeSet<String>> {
        let fields = self.constraint_data.as_ref()?.get("fields")?.as_array()?;

        Some(
            fields
                .iter()
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect(),
        )
    }
}

/// Binding of a user to a role, within one company or globally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRoleAssignment {
    /// Assigned user.
    pub user_id: UserId,
    /// Assigned role.
    pub role_id: RoleId,
    /// Company scope; `None` applies everywhere.
    pub company_id: Option<CompanyId>,
}

impl UserRoleAssignment {
    /// Returns whether the assignment counts for `resource`.
    ///
    /// Resources without a company accept every assignment.
    #[must_use]
    pub fn applies_to(&self, resource: &ResourceScope) -> bool {
        match (resource.company_id, self.company_id) {
            (None, _) | (_, None) => true,
            (Some(resource_company), Some(assigned_company)) => {
                resource_company == assigned_company
            }
        }
    }
}

/// Outcome of an authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationDecision {
    /// At least one active grant matched, or the user is a super admin.
    Allow,
    /// No matching active grant.
    Deny,
}

impl AuthorizationDecision {
    /// Returns whether access is allowed.
    #[must_use]
    pub fn is_allowed(self) -> bool {
        self == Self::Allow
    }
}

/// Stable audit actions emitted by application use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a directory is created.
    DirectoryCreated,
    /// Emitted when a directory is deleted.
    DirectoryDeleted,
    /// Emitted when a field is defined or its metadata changes.
    FieldSaved,
    /// Emitted when a field is deleted.
    FieldDeleted,
    /// Emitted when a company is created.
    CompanyCreated,
    /// Emitted when a company and its tenant data are deleted.
    CompanyDeleted,
    /// Emitted when a module is created.
    ModuleCreated,
    /// Emitted when a module is enabled for a company.
    ModuleEnabled,
    /// Emitted when a directory is enabled for a company.
    DirectoryEnabled,
    /// Emitted when a record is created.
    RecordCreated,
    /// Emitted when a record value is replaced.
    RecordUpdated,
    /// Emitted when a record is deleted.
    RecordDeleted,
    /// Emitted when a permission is created.
    PermissionCreated,
    /// Emitted when a role is created.
    RoleCreated,
    /// Emitted when a role is deleted.
    RoleDeleted,
    /// Emitted when a permission is granted to a role.
    PermissionGranted,
    /// Emitted when a grant is revoked.
    PermissionRevoked,
    /// Emitted when a role is assigned to a user.
    RoleAssigned,
    /// Emitted when a role assignment is removed.
    RoleUnassigned,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectoryCreated => "schema.directory.created",
            Self::DirectoryDeleted => "schema.directory.deleted",
            Self::FieldSaved => "schema.field.saved",
            Self::FieldDeleted => "schema.field.deleted",
            Self::CompanyCreated => "tenancy.company.created",
            Self::CompanyDeleted => "tenancy.company.deleted",
            Self::ModuleCreated => "tenancy.module.created",
            Self::ModuleEnabled => "tenancy.module.enabled",
            Self::DirectoryEnabled => "tenancy.directory.enabled",
            Self::RecordCreated => "records.record.created",
            Self::RecordUpdated => "records.record.updated",
            Self::RecordDeleted => "records.record.deleted",
            Self::PermissionCreated => "security.permission.created",
            Self::RoleCreated => "security.role.created",
            Self::RoleDeleted => "security.role.deleted",
            Self::PermissionGranted => "security.permission.granted",
            Self::PermissionRevoked => "security.permission.revoked",
            Self::RoleAssigned => "security.role.assigned",
            Self::RoleUnassigned => "security.role.unassigned",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;
    use tessera_core::{CompanyId, DirectoryId, ModuleId, PermissionId, RoleId, UserId};

    use super::{
        Permission, PermissionType, ResourceScope, RolePermission, UserRoleAssignment,
    };

    #[test]
    fn permission_type_roundtrip_storage_value() {
        let restored = PermissionType::from_str(PermissionType::Manage.as_str());
        assert_eq!(restored.ok(), Some(PermissionType::Manage));
        assert!(PermissionType::from_str("delete").is_err());
    }

    #[test]
    fn manage_implies_read_and_write() {
        assert!(PermissionType::Manage.satisfies(PermissionType::Read));
        assert!(PermissionType::Manage.satisfies(PermissionType::Write));
        assert!(!PermissionType::Read.satisfies(PermissionType::Write));
        assert!(!PermissionType::Write.satisfies(PermissionType::Manage));
    }

    #[test]
    fn unscoped_permission_matches_any_resource() {
        let permission = Permission::new(
            PermissionId::new(),
            "records.read.all",
            PermissionType::Read,
            None,
            None,
        )
        .unwrap_or_else(|_| unreachable!());

        assert!(permission.matches_scope(&ResourceScope::global()));
        assert!(permission.matches_scope(&ResourceScope::directory(DirectoryId::new())));
    }

    #[test]
    fn scoped_permission_requires_matching_resource() {
        let module_id = ModuleId::new();
        let permission = Permission::new(
            PermissionId::new(),
            "sales.write",
            PermissionType::Write,
            Some(module_id),
            None,
        )
        .unwrap_or_else(|_| unreachable!());

        let inside = ResourceScope {
            module_id: Some(module_id),
            ..ResourceScope::default()
        };
        assert!(permission.allows(PermissionType::Write, &inside));
        assert!(!permission.allows(PermissionType::Write, &ResourceScope::global()));
        assert!(!permission.allows(PermissionType::Manage, &inside));
    }

    #[test]
    fn grant_window_bounds_are_inclusive() {
        let until = Utc
            .with_ymd_and_hms(2025, 6, 30, 12, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!());
        let grant = RolePermission::new(RoleId::new(), PermissionId::new(), None, Some(until), None)
            .unwrap_or_else(|_| unreachable!());

        assert!(grant.is_active_at(until));
        assert!(!grant.is_active_at(until + Duration::milliseconds(1)));
        assert!(grant.has_lapsed_at(until + Duration::milliseconds(1)));
    }

    #[test]
    fn grant_without_window_is_always_active() {
        let grant = RolePermission::new(RoleId::new(), PermissionId::new(), None, None, None)
            .unwrap_or_else(|_| unreachable!());
        assert!(grant.is_active_at(Utc::now()));
        assert!(!grant.has_lapsed_at(Utc::now()));
    }

    #[test]
    fn grant_rejects_inverted_window() {
        let now = Utc::now();
        let result = RolePermission::new(
            RoleId::new(),
            PermissionId::new(),
            Some(now),
            Some(now - Duration::seconds(1)),
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn grant_reads_field_restrictions() {
        let grant = RolePermission::new(
            RoleId::new(),
            PermissionId::new(),
            None,
            None,
            Some(json!({ "fields": ["amount", "payment_type"] })),
        )
        .unwrap_or_else(|_| unreachable!());

        let fields = grant.field_restrictions().unwrap_or_default();
        assert!(fields.contains("amount"));
        assert_eq!(fields.len(), 2);

        let malformed = RolePermission::new(
            RoleId::new(),
            PermissionId::new(),
            None,
            None,
            Some(json!({ "fields": "amount" })),
        );
        assert!(malformed.is_err());
    }

    #[test]
    fn company_assignment_applies_only_to_its_company() {
        let company_id = CompanyId::new();
        let assignment = UserRoleAssignment {
            user_id: UserId::new(),
            role_id: RoleId::new(),
            company_id: Some(company_id),
        };

        let own = ResourceScope {
            company_id: Some(company_id),
            ..ResourceScope::default()
        };
        let other = ResourceScope {
            company_id: Some(CompanyId::new()),
            ..ResourceScope::default()
        };

        assert!(assignment.applies_to(&own));
        assert!(!assignment.applies_to(&other));
        assert!(assignment.applies_to(&ResourceScope::global()));
    }
}
