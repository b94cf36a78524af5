use std::sync::Arc;

use chrono::Utc;
use tessera_core::{
    AppError, AppResult, CompanyDirectoryId, CompanyId, CompanyModuleId, ModuleId, UserIdentity,
};
use tessera_domain::{
    AuditAction, Company, CompanyDirectory, CompanyModule, Module, PermissionType, ResourceScope,
};
use tracing::info;

use crate::audit_ports::{AuditEvent, AuditRepository};
use crate::authorization_service::AuthorizationService;
use crate::schema_ports::DirectoryRepository;
use crate::security_ports::SecurityRepository;
use crate::tenancy_ports::{CompanyRepository, EnableDirectoryInput};

/// Application service for companies, modules and their enablements.
#[derive(Clone)]
pub struct CompanyService {
    companies: Arc<dyn CompanyRepository>,
    directories: Arc<dyn DirectoryRepository>,
    security: Arc<dyn SecurityRepository>,
    authorization_service: AuthorizationService,
    audit_repository: Arc<dyn AuditRepository>,
}

impl CompanyService {
    /// Creates a new company service.
    #[must_use]
    pub fn new(
        companies: Arc<dyn CompanyRepository>,
        directories: Arc<dyn DirectoryRepository>,
        security: Arc<dyn SecurityRepository>,
        authorization_service: AuthorizationService,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            companies,
            directories,
            security,
            authorization_service,
            audit_repository,
        }
    }

    /// Creates a company.
    pub async fn create_company(
        &self,
        actor: &UserIdentity,
        name: impl Into<String>,
    ) -> AppResult<Company> {
        self.require_admin(actor).await?;

        let company = Company::new(CompanyId::new(), name)?;
        self.companies.save_company(company.clone()).await?;

        info!(company_id = %company.id(), "company created");
        self.audit(
            actor,
            Some(company.id()),
            AuditAction::CompanyCreated,
            "company",
            company.id().to_string(),
            format!("created company '{}'", company.name().as_str()),
        )
        .await?;

        Ok(company)
    }

    /// Creates a module; names are unique.
    pub async fn create_module(
        &self,
        actor: &UserIdentity,
        name: impl Into<String>,
    ) -> AppResult<Module> {
        self.require_admin(actor).await?;

        let module = Module::new(ModuleId::new(), name)?;
        self.companies.save_module(module.clone()).await?;

        info!(module_id = %module.id(), "module created");
        self.audit(
            actor,
            None,
            AuditAction::ModuleCreated,
            "module",
            module.id().to_string(),
            format!("created module '{}'", module.name().as_str()),
        )
        .await?;

        Ok(module)
    }

    /// Enables a module for a company; a module is enabled at most once per company.
    pub async fn enable_module(
        &self,
        actor: &UserIdentity,
        company_id: CompanyId,
        module_id: ModuleId,
    ) -> AppResult<CompanyModule> {
        self.require_admin(actor).await?;
        self.require_company(company_id).await?;
        self.companies
            .find_module(module_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("module '{module_id}' does not exist")))?;

        let company_module = CompanyModule {
            id: CompanyModuleId::new(),
            company_id,
            module_id,
        };
        self.companies.save_company_module(company_module).await?;

        info!(company_id = %company_id, module_id = %module_id, "module enabled");
        self.audit(
            actor,
            Some(company_id),
            AuditAction::ModuleEnabled,
            "company_module",
            company_module.id.to_string(),
            format!("enabled module '{module_id}'"),
        )
        .await?;

        Ok(company_module)
    }

    /// Enables a directory for a company under one of the company's modules.
    pub async fn enable_directory(
        &self,
        actor: &UserIdentity,
        input: EnableDirectoryInput,
    ) -> AppResult<CompanyDirectory> {
        self.require_admin(actor).await?;
        self.require_company(input.company_id).await?;
        self.directories
            .find_directory(input.directory_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("directory '{}' does not exist", input.directory_id))
            })?;

        let company_module = self
            .companies
            .find_company_module(input.company_module_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "company module '{}' does not exist",
                    input.company_module_id
                ))
            })?;
        if company_module.company_id != input.company_id {
            return Err(AppError::Validation(format!(
                "company module '{}' belongs to another company",
                input.company_module_id
            )));
        }

        let company_directory = CompanyDirectory {
            id: CompanyDirectoryId::new(),
            company_id: input.company_id,
            directory_id: input.directory_id,
            company_module_id: input.company_module_id,
        };
        self.companies
            .save_company_directory(company_directory)
            .await?;

        info!(
            company_id = %input.company_id,
            directory_id = %input.directory_id,
            "directory enabled"
        );
        self.audit(
            actor,
            Some(input.company_id),
            AuditAction::DirectoryEnabled,
            "company_directory",
            company_directory.id.to_string(),
            format!(
                "enabled directory '{}' under module '{}'",
                input.directory_id, company_module.module_id
            ),
        )
        .await?;

        Ok(company_directory)
    }

    /// Lists the company's directory enablements the actor may read.
    pub async fn list_company_directories(
        &self,
        actor: &UserIdentity,
        company_id: CompanyId,
    ) -> AppResult<Vec<CompanyDirectory>> {
        self.require_company(company_id).await?;
        let authorizer = self
            .authorization_service
            .authorizer(actor.user_id(), Utc::now())
            .await?;

        let mut visible = Vec::new();
        for enablement in self.companies.list_company_directories(company_id).await? {
            let module_id = self
                .companies
                .find_company_module(enablement.company_module_id)
                .await?
                .map(|company_module| company_module.module_id);
            let scope = ResourceScope {
                company_id: Some(company_id),
                module_id,
                directory_id: Some(enablement.directory_id),
            };
            if authorizer.decide(PermissionType::Read, &scope).is_allowed() {
                visible.push(enablement);
            }
        }

        Ok(visible)
    }

    /// Deletes a company with its enablements and records.
    ///
    /// Role assignments made inside the company become global. The detach is idempotent, so
    /// adapters that already detach inside the company delete are unaffected.
    pub async fn delete_company(
        &self,
        actor: &UserIdentity,
        company_id: CompanyId,
    ) -> AppResult<()> {
        self.require_admin(actor).await?;
        let company = self.require_company(company_id).await?;

        self.companies.delete_company(company_id).await?;
        self.security.detach_company_assignments(company_id).await?;

        info!(company_id = %company_id, "company deleted");
        self.audit(
            actor,
            Some(company_id),
            AuditAction::CompanyDeleted,
            "company",
            company_id.to_string(),
            format!("deleted company '{}'", company.name().as_str()),
        )
        .await
    }

    async fn require_admin(&self, actor: &UserIdentity) -> AppResult<()> {
        self.authorization_service
            .require_global(actor, PermissionType::Manage, &ResourceScope::global())
            .await
    }

    async fn require_company(&self, company_id: CompanyId) -> AppResult<Company> {
        self.companies
            .find_company(company_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("company '{company_id}' does not exist")))
    }

    async fn audit(
        &self,
        actor: &UserIdentity,
        company_id: Option<CompanyId>,
        action: AuditAction,
        resource_type: &str,
        resource_id: String,
        detail: String,
    ) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                company_id,
                user_id: actor.user_id(),
                action,
                resource_type: resource_type.to_owned(),
                resource_id,
                detail: Some(detail),
            })
            .await
    }
}
