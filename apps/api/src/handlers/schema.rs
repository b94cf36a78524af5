use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use tessera_application::{CreateDirectoryInput, DefineFieldInput};
use tessera_core::{DirectoryId, FieldId, UserIdentity};
use tessera_domain::{DirectoryType, FieldType};

use crate::dto::{
    CascadingDependentResponse, CreateDirectoryRequest, DefineFieldRequest, DirectoryResponse,
    FieldResponse, ResolveDependentsRequest, UpdateFieldMetadataRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_directories_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<DirectoryResponse>>> {
    let directories = state
        .schema_service
        .list_directories(&user)
        .await?
        .into_iter()
        .map(DirectoryResponse::from)
        .collect();

    Ok(Json(directories))
}

pub async fn create_directory_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateDirectoryRequest>,
) -> ApiResult<(StatusCode, Json<DirectoryResponse>)> {
    let directory = state
        .schema_service
        .create_directory(
            &user,
            CreateDirectoryInput {
                name: payload.name,
                icon: payload.icon,
                directory_type: DirectoryType::from_str(payload.directory_type.as_str())?,
                metadata: payload.metadata,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(DirectoryResponse::from(directory))))
}

pub async fn get_directory_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(directory_id): Path<DirectoryId>,
) -> ApiResult<Json<DirectoryResponse>> {
    let directory = state
        .schema_service
        .get_directory(&user, directory_id)
        .await?;

    Ok(Json(DirectoryResponse::from(directory)))
}

pub async fn delete_directory_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(directory_id): Path<DirectoryId>,
) -> ApiResult<StatusCode> {
    state
        .schema_service
        .delete_directory(&user, directory_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_fields_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(directory_id): Path<DirectoryId>,
) -> ApiResult<Json<Vec<FieldResponse>>> {
    let fields = state
        .schema_service
        .list_fields(&user, directory_id)
        .await?
        .into_iter()
        .map(FieldResponse::from)
        .collect();

    Ok(Json(fields))
}

pub async fn define_field_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(directory_id): Path<DirectoryId>,
    Json(payload): Json<DefineFieldRequest>,
) -> ApiResult<(StatusCode, Json<FieldResponse>)> {
    let field = state
        .schema_service
        .define_field(
            &user,
            DefineFieldInput {
                directory_id,
                name: payload.name,
                field_type: FieldType::from_str(payload.field_type.as_str())?,
                relation_id: payload.relation_id,
                metadata: payload.metadata,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(FieldResponse::from(field))))
}

pub async fn update_field_metadata_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(field_id): Path<FieldId>,
    Json(payload): Json<UpdateFieldMetadataRequest>,
) -> ApiResult<Json<FieldResponse>> {
    let field = state
        .schema_service
        .update_field_metadata(&user, field_id, payload.metadata)
        .await?;

    Ok(Json(FieldResponse::from(field)))
}

pub async fn delete_field_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(field_id): Path<FieldId>,
) -> ApiResult<StatusCode> {
    state.schema_service.delete_field(&user, field_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn resolve_dependents_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(field_id): Path<FieldId>,
    Json(payload): Json<ResolveDependentsRequest>,
) -> ApiResult<Json<Vec<CascadingDependentResponse>>> {
    let dependents = state
        .record_service
        .resolve_dependents(&user, field_id, &payload.value)
        .await?
        .into_iter()
        .map(CascadingDependentResponse::from)
        .collect();

    Ok(Json(dependents))
}
