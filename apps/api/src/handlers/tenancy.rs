use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use tessera_application::EnableDirectoryInput;
use tessera_core::{CompanyId, UserIdentity};

use crate::dto::{
    CompanyDirectoryResponse, CompanyModuleResponse, CompanyResponse, CreateCompanyRequest,
    CreateModuleRequest, EnableDirectoryRequest, EnableModuleRequest, ModuleResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn create_company_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateCompanyRequest>,
) -> ApiResult<(StatusCode, Json<CompanyResponse>)> {
    let company = state
        .company_service
        .create_company(&user, payload.name)
        .await?;

    Ok((StatusCode::CREATED, Json(CompanyResponse::from(company))))
}

pub async fn delete_company_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(company_id): Path<CompanyId>,
) -> ApiResult<StatusCode> {
    state
        .company_service
        .delete_company(&user, company_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_module_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateModuleRequest>,
) -> ApiResult<(StatusCode, Json<ModuleResponse>)> {
    let module = state
        .company_service
        .create_module(&user, payload.name)
        .await?;

    Ok((StatusCode::CREATED, Json(ModuleResponse::from(module))))
}

pub async fn enable_module_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(company_id): Path<CompanyId>,
    Json(payload): Json<EnableModuleRequest>,
) -> ApiResult<(StatusCode, Json<CompanyModuleResponse>)> {
    let company_module = state
        .company_service
        .enable_module(&user, company_id, payload.module_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CompanyModuleResponse::from(company_module)),
    ))
}

pub async fn list_company_directories_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(company_id): Path<CompanyId>,
) -> ApiResult<Json<Vec<CompanyDirectoryResponse>>> {
    let enablements = state
        .company_service
        .list_company_directories(&user, company_id)
        .await?
        .into_iter()
        .map(CompanyDirectoryResponse::from)
        .collect();

    Ok(Json(enablements))
}

pub async fn enable_directory_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(company_id): Path<CompanyId>,
    Json(payload): Json<EnableDirectoryRequest>,
) -> ApiResult<(StatusCode, Json<CompanyDirectoryResponse>)> {
    let enablement = state
        .company_service
        .enable_directory(
            &user,
            EnableDirectoryInput {
                company_id,
                directory_id: payload.directory_id,
                company_module_id: payload.company_module_id,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CompanyDirectoryResponse::from(enablement)),
    ))
}
