use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use tessera_application::CreateRecordInput;
use tessera_core::{CompanyDirectoryId, FieldId, RecordId, UserIdentity};

use crate::dto::{
    CascadingOptionsRequest, CascadingOptionsResponse, CreateRecordRequest, RecordResponse,
    UpdateValueRequest, ValueUpdateResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

/// Lists records; every query parameter is an exact `field=value` filter.
pub async fn list_records_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(company_directory_id): Path<CompanyDirectoryId>,
    Query(filters): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Vec<RecordResponse>>> {
    let records = state
        .record_service
        .list_records(&user, company_directory_id, filters)
        .await?
        .into_iter()
        .map(RecordResponse::from)
        .collect();

    Ok(Json(records))
}

pub async fn create_record_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(company_directory_id): Path<CompanyDirectoryId>,
    Json(payload): Json<CreateRecordRequest>,
) -> ApiResult<(StatusCode, Json<RecordResponse>)> {
    let record = state
        .record_service
        .create_record(
            &user,
            CreateRecordInput {
                company_directory_id,
                values: payload.values,
                metadata: payload.metadata,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RecordResponse::from(record))))
}

pub async fn get_record_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(record_id): Path<RecordId>,
) -> ApiResult<Json<RecordResponse>> {
    let record = state.record_service.get_record(&user, record_id).await?;

    Ok(Json(RecordResponse::from(record)))
}

pub async fn delete_record_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(record_id): Path<RecordId>,
) -> ApiResult<StatusCode> {
    state.record_service.delete_record(&user, record_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_value_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path((record_id, field_id)): Path<(RecordId, FieldId)>,
    Json(payload): Json<UpdateValueRequest>,
) -> ApiResult<Json<ValueUpdateResponse>> {
    let update = state
        .record_service
        .update_value(&user, record_id, field_id, payload.value)
        .await?;

    Ok(Json(ValueUpdateResponse::from(update)))
}

pub async fn cascading_options_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(field_id): Path<FieldId>,
    Json(payload): Json<CascadingOptionsRequest>,
) -> ApiResult<Json<Vec<CascadingOptionsResponse>>> {
    let options = state
        .record_service
        .cascading_options(&user, payload.company_id, field_id, &payload.value)
        .await?
        .into_iter()
        .map(CascadingOptionsResponse::from)
        .collect();

    Ok(Json(options))
}
