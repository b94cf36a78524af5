use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tessera_application::{
    CompanyRepository, DirectoryRepository, RecordFilter, RecordRepository, StoredValue,
};
use tessera_core::{
    AppError, AppResult, CompanyDirectoryId, CompanyId, CompanyModuleId, DirectoryId, FieldId,
    ModuleId, RecordId,
};
use tessera_domain::{
    Company, CompanyDirectory, CompanyModule, Directory, DirectoryField, DirectoryRecord,
    DirectoryValue, Module,
};
use tokio::sync::RwLock;

/// Row tagged with its insertion sequence.
#[derive(Debug, Clone)]
struct Sequenced<T> {
    position: u64,
    row: T,
}

#[derive(Debug, Default)]
struct StoreState {
    next_position: u64,
    directories: HashMap<DirectoryId, Directory>,
    fields: HashMap<FieldId, Sequenced<DirectoryField>>,
    companies: HashMap<CompanyId, Company>,
    modules: HashMap<ModuleId, Module>,
    company_modules: HashMap<CompanyModuleId, CompanyModule>,
    company_directories: HashMap<CompanyDirectoryId, CompanyDirectory>,
    records: HashMap<RecordId, Sequenced<DirectoryRecord>>,
    values: HashMap<(RecordId, FieldId), StoredValue>,
}

impl StoreState {
    fn next_position(&mut self) -> u64 {
        self.next_position += 1;
        self.next_position
    }

    fn remove_records(&mut self, record_ids: &HashSet<RecordId>) {
        self.values
            .retain(|(record_id, _), _| !record_ids.contains(record_id));
        self.records
            .retain(|record_id, _| !record_ids.contains(record_id));
    }

    fn records_of(&self, enablements: &HashSet<CompanyDirectoryId>) -> HashSet<RecordId> {
        self.records
            .values()
            .filter(|record| enablements.contains(&record.row.company_directory_id()))
            .map(|record| record.row.id())
            .collect()
    }
}

/// In-memory adapter for the schema, record and tenancy ports.
///
/// One lock guards all three aggregates so cross-aggregate cascades stay atomic.
#[derive(Debug, Default)]
pub struct InMemoryDirectoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryDirectoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DirectoryRepository for InMemoryDirectoryStore {
    async fn save_directory(&self, directory: Directory) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state
            .directories
            .values()
            .any(|stored| stored.name() == directory.name())
        {
            return Err(AppError::Conflict(format!(
                "directory '{}' already exists",
                directory.name().as_str()
            )));
        }

        state.directories.insert(directory.id(), directory);
        Ok(())
    }

    async fn find_directory(&self, directory_id: DirectoryId) -> AppResult<Option<Directory>> {
        Ok(self.state.read().await.directories.get(&directory_id).cloned())
    }

    async fn list_directories(&self) -> AppResult<Vec<Directory>> {
        let state = self.state.read().await;
        let mut directories: Vec<Directory> = state.directories.values().cloned().collect();
        directories.sort_by(|left, right| left.name().as_str().cmp(right.name().as_str()));
        Ok(directories)
    }

    async fn delete_directory(&self, directory_id: DirectoryId) -> AppResult<()> {
        let mut state = self.state.write().await;
        let enablements: HashSet<CompanyDirectoryId> = state
            .company_directories
            .values()
            .filter(|enablement| enablement.directory_id == directory_id)
            .map(|enablement| enablement.id)
            .collect();
        let record_ids = state.records_of(&enablements);
        state.remove_records(&record_ids);

        state
            .company_directories
            .retain(|id, _| !enablements.contains(id));
        state
            .fields
            .retain(|_, field| field.row.directory_id() != directory_id);
        let field_ids: HashSet<FieldId> = state.fields.keys().copied().collect();
        state
            .values
            .retain(|(_, field_id), _| field_ids.contains(field_id));
        state.directories.remove(&directory_id);
        Ok(())
    }

    async fn save_field(&self, field: DirectoryField) -> AppResult<()> {
        let mut state = self.state.write().await;
        if !state.directories.contains_key(&field.directory_id()) {
            return Err(AppError::NotFound(format!(
                "directory '{}' does not exist",
                field.directory_id()
            )));
        }
        if state.fields.values().any(|stored| {
            stored.row.directory_id() == field.directory_id()
                && stored.row.name() == field.name()
                && stored.row.id() != field.id()
        }) {
            return Err(AppError::Conflict(format!(
                "field '{}' already exists in directory '{}'",
                field.name().as_str(),
                field.directory_id()
            )));
        }

        let existing = state.fields.get(&field.id()).map(|stored| stored.position);
        let position = match existing {
            Some(position) => position,
            None => state.next_position(),
        };
        state
            .fields
            .insert(field.id(), Sequenced { position, row: field });
        Ok(())
    }

    async fn find_field(&self, field_id: FieldId) -> AppResult<Option<DirectoryField>> {
        Ok(self
            .state
            .read()
            .await
            .fields
            .get(&field_id)
            .map(|field| field.row.clone()))
    }

    async fn list_fields(&self, directory_id: DirectoryId) -> AppResult<Vec<DirectoryField>> {
        let state = self.state.read().await;
        let mut fields: Vec<&Sequenced<DirectoryField>> = state
            .fields
            .values()
            .filter(|field| field.row.directory_id() == directory_id)
            .collect();
        fields.sort_by_key(|field| field.position);
        Ok(fields.into_iter().map(|field| field.row.clone()).collect())
    }

    async fn list_referencing_fields(
        &self,
        directory_id: DirectoryId,
    ) -> AppResult<Vec<DirectoryField>> {
        let state = self.state.read().await;
        let mut fields: Vec<&Sequenced<DirectoryField>> = state
            .fields
            .values()
            .filter(|field| {
                field.row.directory_id() != directory_id
                    && (field.row.relation_id() == Some(directory_id)
                        || field.row.cascading_target() == Some(directory_id))
            })
            .collect();
        fields.sort_by_key(|field| field.position);
        Ok(fields.into_iter().map(|field| field.row.clone()).collect())
    }

    async fn list_cascading_trigger_fields(&self) -> AppResult<Vec<DirectoryField>> {
        let state = self.state.read().await;
        let mut fields: Vec<&Sequenced<DirectoryField>> = state
            .fields
            .values()
            .filter(|field| field.row.cascading_target().is_some())
            .collect();
        fields.sort_by_key(|field| field.position);
        Ok(fields.into_iter().map(|field| field.row.clone()).collect())
    }

    async fn delete_field(&self, field_id: FieldId) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.fields.remove(&field_id);
        state
            .values
            .retain(|(_, stored_field_id), _| *stored_field_id != field_id);
        Ok(())
    }
}

#[async_trait]
impl RecordRepository for InMemoryDirectoryStore {
    async fn create_record(
        &self,
        record: DirectoryRecord,
        values: Vec<DirectoryValue>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        let directory_id = state
            .company_directories
            .get(&record.company_directory_id())
            .map(|enablement| enablement.directory_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "company directory '{}' does not exist",
                    record.company_directory_id()
                ))
            })?;

        for value in &values {
            let belongs = state
                .fields
                .get(&value.field_id())
                .is_some_and(|field| field.row.directory_id() == directory_id);
            if !belongs || value.record_id() != record.id() {
                return Err(AppError::Validation(format!(
                    "value '{}' is not bound to the record's directory",
                    value.id()
                )));
            }
        }

        for value in values {
            state.values.insert(
                (value.record_id(), value.field_id()),
                StoredValue {
                    value_id: value.id(),
                    record_id: value.record_id(),
                    field_id: value.field_id(),
                    value: value.storage_text(),
                },
            );
        }
        let position = state.next_position();
        state
            .records
            .insert(record.id(), Sequenced { position, row: record });
        Ok(())
    }

    async fn find_record(&self, record_id: RecordId) -> AppResult<Option<DirectoryRecord>> {
        Ok(self
            .state
            .read()
            .await
            .records
            .get(&record_id)
            .map(|record| record.row.clone()))
    }

    async fn list_values(&self, record_ids: &[RecordId]) -> AppResult<Vec<StoredValue>> {
        let state = self.state.read().await;
        let mut values: Vec<StoredValue> = state
            .values
            .values()
            .filter(|value| record_ids.contains(&value.record_id))
            .cloned()
            .collect();
        values.sort_by_key(|value| {
            (
                state.records.get(&value.record_id).map(|record| record.position),
                state.fields.get(&value.field_id).map(|field| field.position),
            )
        });
        Ok(values)
    }

    async fn update_value(
        &self,
        record_id: RecordId,
        field_id: FieldId,
        value: String,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        let stored = state.values.get_mut(&(record_id, field_id)).ok_or_else(|| {
            AppError::NotFound(format!(
                "record '{record_id}' has no value for field '{field_id}'"
            ))
        })?;
        stored.value = value;
        Ok(())
    }

    async fn delete_record(&self, record_id: RecordId) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.remove_records(&HashSet::from([record_id]));
        Ok(())
    }

    async fn list_records(
        &self,
        company_directory_id: CompanyDirectoryId,
        filters: &[RecordFilter],
    ) -> AppResult<Vec<DirectoryRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<&Sequenced<DirectoryRecord>> = state
            .records
            .values()
            .filter(|record| record.row.company_directory_id() == company_directory_id)
            .filter(|record| {
                filters.iter().all(|filter| {
                    state
                        .values
                        .get(&(record.row.id(), filter.field_id))
                        .is_some_and(|stored| filter.values.contains(&stored.value))
                })
            })
            .collect();
        records.sort_by_key(|record| (record.row.created_at(), record.position));
        Ok(records.into_iter().map(|record| record.row.clone()).collect())
    }

    async fn record_exists_in_directory(
        &self,
        record_id: RecordId,
        directory_id: DirectoryId,
        company_id: CompanyId,
    ) -> AppResult<bool> {
        let state = self.state.read().await;
        Ok(state.records.get(&record_id).is_some_and(|record| {
            state
                .company_directories
                .get(&record.row.company_directory_id())
                .is_some_and(|enablement| {
                    enablement.directory_id == directory_id && enablement.company_id == company_id
                })
        }))
    }
}

#[async_trait]
impl CompanyRepository for InMemoryDirectoryStore {
    async fn save_company(&self, company: Company) -> AppResult<()> {
        self.state
            .write()
            .await
            .companies
            .insert(company.id(), company);
        Ok(())
    }

    async fn find_company(&self, company_id: CompanyId) -> AppResult<Option<Company>> {
        Ok(self.state.read().await.companies.get(&company_id).cloned())
    }

    async fn delete_company(&self, company_id: CompanyId) -> AppResult<()> {
        let mut state = self.state.write().await;
        let enablements: HashSet<CompanyDirectoryId> = state
            .company_directories
            .values()
            .filter(|enablement| enablement.company_id == company_id)
            .map(|enablement| enablement.id)
            .collect();
        let record_ids = state.records_of(&enablements);
        state.remove_records(&record_ids);

        state
            .company_directories
            .retain(|id, _| !enablements.contains(id));
        state
            .company_modules
            .retain(|_, company_module| company_module.company_id != company_id);
        state.companies.remove(&company_id);
        Ok(())
    }

    async fn save_module(&self, module: Module) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state
            .modules
            .values()
            .any(|stored| stored.name() == module.name())
        {
            return Err(AppError::Conflict(format!(
                "module '{}' already exists",
                module.name().as_str()
            )));
        }

        state.modules.insert(module.id(), module);
        Ok(())
    }

    async fn find_module(&self, module_id: ModuleId) -> AppResult<Option<Module>> {
        Ok(self.state.read().await.modules.get(&module_id).cloned())
    }

    async fn save_company_module(&self, company_module: CompanyModule) -> AppResult<()> {
        let mut state = self.state.write().await;
        if !state.companies.contains_key(&company_module.company_id)
            || !state.modules.contains_key(&company_module.module_id)
        {
            return Err(AppError::NotFound(
                "company or module does not exist".to_owned(),
            ));
        }
        if state.company_modules.values().any(|stored| {
            stored.company_id == company_module.company_id
                && stored.module_id == company_module.module_id
        }) {
            return Err(AppError::Conflict(format!(
                "module '{}' is already enabled for company '{}'",
                company_module.module_id, company_module.company_id
            )));
        }

        state
            .company_modules
            .insert(company_module.id, company_module);
        Ok(())
    }

    async fn find_company_module(
        &self,
        company_module_id: CompanyModuleId,
    ) -> AppResult<Option<CompanyModule>> {
        Ok(self
            .state
            .read()
            .await
            .company_modules
            .get(&company_module_id)
            .copied())
    }

    async fn save_company_directory(&self, company_directory: CompanyDirectory) -> AppResult<()> {
        let mut state = self.state.write().await;
        if !state.directories.contains_key(&company_directory.directory_id)
            || !state
                .company_modules
                .contains_key(&company_directory.company_module_id)
        {
            return Err(AppError::NotFound(
                "directory or company module does not exist".to_owned(),
            ));
        }
        if state.company_directories.values().any(|stored| {
            stored.company_id == company_directory.company_id
                && stored.directory_id == company_directory.directory_id
        }) {
            return Err(AppError::Conflict(format!(
                "directory '{}' is already enabled for company '{}'",
                company_directory.directory_id, company_directory.company_id
            )));
        }

        state
            .company_directories
            .insert(company_directory.id, company_directory);
        Ok(())
    }

    async fn find_company_directory(
        &self,
        company_directory_id: CompanyDirectoryId,
    ) -> AppResult<Option<CompanyDirectory>> {
        Ok(self
            .state
            .read()
            .await
            .company_directories
            .get(&company_directory_id)
            .copied())
    }

    async fn find_company_directory_for(
        &self,
        company_id: CompanyId,
        directory_id: DirectoryId,
    ) -> AppResult<Option<CompanyDirectory>> {
        Ok(self
            .state
            .read()
            .await
            .company_directories
            .values()
            .find(|enablement| {
                enablement.company_id == company_id && enablement.directory_id == directory_id
            })
            .copied())
    }

    async fn list_company_directories(
        &self,
        company_id: CompanyId,
    ) -> AppResult<Vec<CompanyDirectory>> {
        let state = self.state.read().await;
        let mut enablements: Vec<CompanyDirectory> = state
            .company_directories
            .values()
            .filter(|enablement| enablement.company_id == company_id)
            .copied()
            .collect();
        enablements.sort_by_key(|enablement| {
            state
                .directories
                .get(&enablement.directory_id)
                .map(|directory| directory.name().as_str().to_owned())
        });
        Ok(enablements)
    }
}
