use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::from_fn;
use axum::routing::{delete, get, post, put};
use tessera_core::AppError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{COMPANY_ID_HEADER, USER_ID_HEADER, USER_NAME_HEADER};
use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState, frontend_url: Option<&str>) -> Result<Router, AppError> {
    let protected_routes = Router::new()
        .route(
            "/api/directories",
            get(handlers::schema::list_directories_handler)
                .post(handlers::schema::create_directory_handler),
        )
        .route(
            "/api/directories/{directory_id}",
            get(handlers::schema::get_directory_handler)
                .delete(handlers::schema::delete_directory_handler),
        )
        .route(
            "/api/directories/{directory_id}/fields",
            get(handlers::schema::list_fields_handler)
                .post(handlers::schema::define_field_handler),
        )
        .route(
            "/api/fields/{field_id}",
            delete(handlers::schema::delete_field_handler),
        )
        .route(
            "/api/fields/{field_id}/metadata",
            put(handlers::schema::update_field_metadata_handler),
        )
        .route(
            "/api/fields/{field_id}/dependents",
            post(handlers::schema::resolve_dependents_handler),
        )
        .route(
            "/api/fields/{field_id}/cascading-options",
            post(handlers::records::cascading_options_handler),
        )
        .route(
            "/api/company-directories/{company_directory_id}/records",
            get(handlers::records::list_records_handler)
                .post(handlers::records::create_record_handler),
        )
        .route(
            "/api/records/{record_id}",
            get(handlers::records::get_record_handler)
                .delete(handlers::records::delete_record_handler),
        )
        .route(
            "/api/records/{record_id}/values/{field_id}",
            put(handlers::records::update_value_handler),
        )
        .route(
            "/api/companies",
            post(handlers::tenancy::create_company_handler),
        )
        .route(
            "/api/companies/{company_id}",
            delete(handlers::tenancy::delete_company_handler),
        )
        .route(
            "/api/companies/{company_id}/modules",
            post(handlers::tenancy::enable_module_handler),
        )
        .route(
            "/api/companies/{company_id}/directories",
            get(handlers::tenancy::list_company_directories_handler)
                .post(handlers::tenancy::enable_directory_handler),
        )
        .route("/api/modules", post(handlers::tenancy::create_module_handler))
        .route(
            "/api/security/permissions",
            get(handlers::security::list_permissions_handler)
                .post(handlers::security::create_permission_handler),
        )
        .route(
            "/api/security/roles",
            get(handlers::security::list_roles_handler)
                .post(handlers::security::create_role_handler),
        )
        .route(
            "/api/security/roles/{role_id}",
            delete(handlers::security::delete_role_handler),
        )
        .route(
            "/api/security/roles/{role_id}/grants",
            get(handlers::security::list_grants_handler)
                .post(handlers::security::grant_permission_handler),
        )
        .route(
            "/api/security/roles/{role_id}/grants/{permission_id}",
            delete(handlers::security::revoke_permission_handler),
        )
        .route(
            "/api/security/assignments",
            post(handlers::security::assign_role_handler)
                .delete(handlers::security::unassign_role_handler),
        )
        .route(
            "/api/security/authorize",
            post(handlers::security::authorize_handler),
        )
        .route_layer(from_fn(middleware::require_actor));

    let router = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http());

    let router = match frontend_url {
        Some(frontend_url) => router.layer(build_cors_layer(frontend_url)?),
        None => router,
    };

    Ok(router.with_state(app_state))
}

fn build_cors_layer(frontend_url: &str) -> Result<CorsLayer, AppError> {
    Ok(CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(frontend_url)
                .map_err(|error| AppError::Validation(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(COMPANY_ID_HEADER),
            HeaderName::from_static(USER_NAME_HEADER),
        ]))
}
