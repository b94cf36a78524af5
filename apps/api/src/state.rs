use std::sync::Arc;

use tessera_application::{
    AuditRepository, AuthorizationService, CompanyRepository, CompanyService,
    DirectoryRepository, DirectorySchemaService, PermissionService, RecordRepository,
    RecordService, SecurityRepository,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub schema_service: DirectorySchemaService,
    pub record_service: RecordService,
    pub permission_service: PermissionService,
    pub company_service: CompanyService,
    pub authorization_service: AuthorizationService,
}

/// Storage ports every service is wired against.
pub struct Repositories {
    pub directories: Arc<dyn DirectoryRepository>,
    pub records: Arc<dyn RecordRepository>,
    pub companies: Arc<dyn CompanyRepository>,
    pub security: Arc<dyn SecurityRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

impl AppState {
    pub fn new(repositories: Repositories) -> Self {
        let Repositories {
            directories,
            records,
            companies,
            security,
            audit,
        } = repositories;
        let authorization_service = AuthorizationService::new(security.clone());

        Self {
            schema_service: DirectorySchemaService::new(
                directories.clone(),
                authorization_service.clone(),
                audit.clone(),
            ),
            record_service: RecordService::new(
                directories.clone(),
                records,
                companies.clone(),
                authorization_service.clone(),
                audit.clone(),
            ),
            permission_service: PermissionService::new(
                security.clone(),
                authorization_service.clone(),
                audit.clone(),
            ),
            company_service: CompanyService::new(
                companies,
                directories,
                security,
                authorization_service.clone(),
                audit,
            ),
            authorization_service,
        }
    }
}
