use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use tessera_application::{CreatePermissionInput, GrantPermissionInput};
use tessera_core::{PermissionId, RoleId, UserIdentity};
use tessera_domain::{PermissionType, ResourceScope, UserRoleAssignment};

use crate::dto::{
    AuthorizeRequest, AuthorizeResponse, CreatePermissionRequest, CreateRoleRequest,
    GrantPermissionRequest, PermissionResponse, RoleAssignmentRequest, RoleGrantResponse,
    RoleResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let permissions = state
        .permission_service
        .list_permissions(&user)
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}

pub async fn create_permission_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreatePermissionRequest>,
) -> ApiResult<(StatusCode, Json<PermissionResponse>)> {
    let permission = state
        .permission_service
        .create_permission(
            &user,
            CreatePermissionInput {
                name: payload.name,
                permission_type: PermissionType::from_str(payload.permission_type.as_str())?,
                module_id: payload.module_id,
                directory_id: payload.directory_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(PermissionResponse::from(permission))))
}

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .permission_service
        .list_roles(&user)
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state
        .permission_service
        .create_role(&user, payload.name)
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(role_id): Path<RoleId>,
) -> ApiResult<StatusCode> {
    state.permission_service.delete_role(&user, role_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_grants_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(role_id): Path<RoleId>,
) -> ApiResult<Json<Vec<RoleGrantResponse>>> {
    let grants = state
        .permission_service
        .list_grants(&user, role_id)
        .await?
        .into_iter()
        .map(RoleGrantResponse::from)
        .collect();

    Ok(Json(grants))
}

pub async fn grant_permission_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(role_id): Path<RoleId>,
    Json(payload): Json<GrantPermissionRequest>,
) -> ApiResult<(StatusCode, Json<RoleGrantResponse>)> {
    let grant = state
        .permission_service
        .grant(
            &user,
            GrantPermissionInput {
                role_id,
                permission_id: payload.permission_id,
                effective_from: payload.effective_from,
                effective_until: payload.effective_until,
                constraint_data: payload.constraint_data,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RoleGrantResponse::from(grant))))
}

pub async fn revoke_permission_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path((role_id, permission_id)): Path<(RoleId, PermissionId)>,
) -> ApiResult<StatusCode> {
    state
        .permission_service
        .revoke(&user, role_id, permission_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<RoleAssignmentRequest>,
) -> ApiResult<StatusCode> {
    state
        .permission_service
        .assign_role(&user, assignment_from_request(payload))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn unassign_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<RoleAssignmentRequest>,
) -> ApiResult<StatusCode> {
    state
        .permission_service
        .unassign_role(&user, assignment_from_request(payload))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Evaluates a decision for the calling user.
pub async fn authorize_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<AuthorizeRequest>,
) -> ApiResult<Json<AuthorizeResponse>> {
    let action = PermissionType::from_str(payload.action.as_str())?;
    let resource = ResourceScope {
        company_id: payload.company_id.or(user.company_id()),
        module_id: payload.module_id,
        directory_id: payload.directory_id,
    };

    let decision = state
        .authorization_service
        .authorize(
            user.user_id(),
            action,
            &resource,
            payload.at.unwrap_or_else(Utc::now),
        )
        .await?;

    Ok(Json(AuthorizeResponse::from(decision)))
}

fn assignment_from_request(payload: RoleAssignmentRequest) -> UserRoleAssignment {
    UserRoleAssignment {
        user_id: payload.user_id,
        role_id: payload.role_id,
        company_id: payload.company_id,
    }
}
