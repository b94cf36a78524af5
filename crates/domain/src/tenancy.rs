use serde::{Deserialize, Serialize};
use tessera_core::{
    AppResult, CompanyDirectoryId, CompanyId, CompanyModuleId, DirectoryId, ModuleId,
    NonEmptyString,
};

/// Tenant owning directory instances and role assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    id: CompanyId,
    name: NonEmptyString,
}

impl Company {
    /// Creates a validated company.
    pub fn new(id: CompanyId, name: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
        })
    }

    /// Returns the company identifier.
    #[must_use]
    pub fn id(&self) -> CompanyId {
        self.id
    }

    /// Returns the company name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }
}

/// Functional module that companies can enable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    id: ModuleId,
    name: NonEmptyString,
}

impl Module {
    /// Creates a validated module.
    pub fn new(id: ModuleId, name: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
        })
    }

    /// Returns the module identifier.
    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Returns the module name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }
}

/// Module enabled for one company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyModule {
    /// Join identity.
    pub id: CompanyModuleId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Enabled module.
    pub module_id: ModuleId,
}

/// Directory enabled for one company under one of its modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyDirectory {
    /// Join identity; owns the directory records.
    pub id: CompanyDirectoryId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Directory schema used by the records.
    pub directory_id: DirectoryId,
    /// Company module the directory is enabled under.
    pub company_module_id: CompanyModuleId,
}
