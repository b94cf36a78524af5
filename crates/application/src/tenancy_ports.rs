use async_trait::async_trait;
use tessera_core::{
    AppResult, CompanyDirectoryId, CompanyId, CompanyModuleId, DirectoryId, ModuleId,
};
use tessera_domain::{Company, CompanyDirectory, CompanyModule, Module};

/// Input payload for enabling a directory inside a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnableDirectoryInput {
    /// Target company.
    pub company_id: CompanyId,
    /// Directory to enable.
    pub directory_id: DirectoryId,
    /// Company module the directory is enabled under.
    pub company_module_id: CompanyModuleId,
}

/// Repository port for companies, modules and their enablements.
#[async_trait]
pub trait CompanyRepository: Send + Sync {
    /// Saves a new company.
    async fn save_company(&self, company: Company) -> AppResult<()>;

    /// Finds a company by identifier.
    async fn find_company(&self, company_id: CompanyId) -> AppResult<Option<Company>>;

    /// Deletes a company with its module enablements, directory enablements and records.
    ///
    /// Adapters storing role assignments alongside companies detach them in the same
    /// transaction.
    async fn delete_company(&self, company_id: CompanyId) -> AppResult<()>;

    /// Saves a new module; names are unique.
    async fn save_module(&self, module: Module) -> AppResult<()>;

    /// Finds a module by identifier.
    async fn find_module(&self, module_id: ModuleId) -> AppResult<Option<Module>>;

    /// Saves a module enablement; a module is enabled at most once per company.
    async fn save_company_module(&self, company_module: CompanyModule) -> AppResult<()>;

    /// Finds a module enablement by identifier.
    async fn find_company_module(
        &self,
        company_module_id: CompanyModuleId,
    ) -> AppResult<Option<CompanyModule>>;

    /// Saves a directory enablement; a directory is enabled at most once per company.
    async fn save_company_directory(&self, company_directory: CompanyDirectory) -> AppResult<()>;

    /// Finds a directory enablement by identifier.
    async fn find_company_directory(
        &self,
        company_directory_id: CompanyDirectoryId,
    ) -> AppResult<Option<CompanyDirectory>>;

    /// Finds the enablement of `directory_id` inside `company_id`.
    async fn find_company_directory_for(
        &self,
        company_id: CompanyId,
        directory_id: DirectoryId,
    ) -> AppResult<Option<CompanyDirectory>>;

    /// Lists directory enablements of a company.
    async fn list_company_directories(
        &self,
        company_id: CompanyId,
    ) -> AppResult<Vec<CompanyDirectory>>;
}
