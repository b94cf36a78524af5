use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_core::{CompanyId, DirectoryId, ModuleId, PermissionId, RoleId, UserId};
use tessera_domain::AuthorizationDecision;

/// Incoming payload for permission creation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePermissionRequest {
    pub name: String,
    pub permission_type: String,
    pub module_id: Option<ModuleId>,
    pub directory_id: Option<DirectoryId>,
}

/// API representation of a permission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResponse {
    pub id: PermissionId,
    pub name: String,
    pub permission_type: String,
    pub module_id: Option<ModuleId>,
    pub directory_id: Option<DirectoryId>,
}

/// Incoming payload for role creation.
#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
}

/// API representation of a role.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    pub id: RoleId,
    pub name: String,
    pub is_system: bool,
}

/// Incoming payload for granting a permission to the role in the path.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantPermissionRequest {
    pub permission_id: PermissionId,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_until: Option<DateTime<Utc>>,
    pub constraint_data: Option<Value>,
}

/// API representation of a role grant.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleGrantResponse {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_until: Option<DateTime<Utc>>,
    pub constraint_data: Option<Value>,
}

/// Incoming payload for role assignment and unassignment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignmentRequest {
    pub user_id: UserId,
    pub role_id: RoleId,
    pub company_id: Option<CompanyId>,
}

/// Action and resource evaluated for the calling user.
///
/// `companyId` falls back to the company selected by the caller; `at` defaults to now.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeRequest {
    pub action: String,
    pub company_id: Option<CompanyId>,
    pub module_id: Option<ModuleId>,
    pub directory_id: Option<DirectoryId>,
    pub at: Option<DateTime<Utc>>,
}

/// Authorization decision for the calling user.
#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub decision: AuthorizationDecision,
    pub allowed: bool,
}
