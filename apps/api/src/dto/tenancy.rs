use serde::{Deserialize, Serialize};
use tessera_core::{CompanyDirectoryId, CompanyId, CompanyModuleId, DirectoryId, ModuleId};
use tessera_domain::{Company, CompanyDirectory, CompanyModule, Module};

/// Incoming payload for company creation.
#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
}

/// API representation of a company.
#[derive(Debug, Serialize)]
pub struct CompanyResponse {
    pub id: CompanyId,
    pub name: String,
}

/// Incoming payload for module creation.
#[derive(Debug, Deserialize)]
pub struct CreateModuleRequest {
    pub name: String,
}

/// API representation of a module.
#[derive(Debug, Serialize)]
pub struct ModuleResponse {
    pub id: ModuleId,
    pub name: String,
}

/// Incoming payload for enabling a module inside a company.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableModuleRequest {
    pub module_id: ModuleId,
}

/// API representation of a module enabled for a company.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyModuleResponse {
    pub id: CompanyModuleId,
    pub company_id: CompanyId,
    pub module_id: ModuleId,
}

/// Incoming payload for enabling a directory inside a company.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableDirectoryRequest {
    pub directory_id: DirectoryId,
    pub company_module_id: CompanyModuleId,
}

/// API representation of a directory enabled for a company.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDirectoryResponse {
    pub id: CompanyDirectoryId,
    pub company_id: CompanyId,
    pub directory_id: DirectoryId,
    pub company_module_id: CompanyModuleId,
}

impl From<Company> for CompanyResponse {
    fn from(value: Company) -> Self {
        Self {
            id: value.id(),
            name: value.name().as_str().to_owned(),
        }
    }
}

impl From<Module> for ModuleResponse {
    fn from(value: Module) -> Self {
        Self {
            id: value.id(),
            name: value.name().as_str().to_owned(),
        }
    }
}

impl From<CompanyModule> for CompanyModuleResponse {
    fn from(value: CompanyModule) -> Self {
        Self {
            id: value.id,
            company_id: value.company_id,
            module_id: value.module_id,
        }
    }
}

impl From<CompanyDirectory> for CompanyDirectoryResponse {
    fn from(value: CompanyDirectory) -> Self {
        Self {
            id: value.id,
            company_id: value.company_id,
            directory_id: value.directory_id,
            company_module_id: value.company_module_id,
        }
    }
}
