use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tessera_core::{
    AppError, AppResult, CompanyDirectoryId, CompanyId, CompanyModuleId, DirectoryId, FieldId,
    ModuleId, PermissionId, RecordId, RoleId, UserId, UserIdentity,
};
use tessera_domain::{
    Company, CompanyDirectory, CompanyModule, Directory, DirectoryField, DirectoryRecord,
    DirectoryType, DirectoryValue, Module, Permission, PermissionType, RolePermission,
    SUPER_ADMIN_ROLE, UserRole, UserRoleAssignment,
};
use tokio::sync::Mutex;

use crate::{
    AssignedRole, AuditEvent, AuditRepository, AuthorizationService, CascadingResolver,
    CompanyRepository, DirectoryRepository, RecordFilter, RecordRepository, RoleGrant,
    SecurityRepository, StoredValue,
};

#[derive(Default)]
struct StoreState {
    directories: Vec<Directory>,
    fields: Vec<DirectoryField>,
    companies: Vec<Company>,
    modules: Vec<Module>,
    company_modules: Vec<CompanyModule>,
    company_directories: Vec<CompanyDirectory>,
    records: Vec<DirectoryRecord>,
    values: Vec<StoredValue>,
}

/// Single fake backing the schema, record and tenancy ports.
#[derive(Default)]
pub(crate) struct FakeStore {
    state: Mutex<StoreState>,
}

#[async_trait]
impl DirectoryRepository for FakeStore {
    async fn save_directory(&self, directory: Directory) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state
            .directories
            .iter()
            .any(|stored| stored.name() == directory.name())
        {
            return Err(AppError::Conflict(format!(
                "directory '{}' already exists",
                directory.name().as_str()
            )));
        }
        state.directories.push(directory);
        Ok(())
    }

    async fn find_directory(&self, directory_id: DirectoryId) -> AppResult<Option<Directory>> {
        let state = self.state.lock().await;
        Ok(state
            .directories
            .iter()
            .find(|directory| directory.id() == directory_id)
            .cloned())
    }

    async fn list_directories(&self) -> AppResult<Vec<Directory>> {
        Ok(self.state.lock().await.directories.clone())
    }

    async fn delete_directory(&self, directory_id: DirectoryId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let field_ids: HashSet<FieldId> = state
            .fields
            .iter()
            .filter(|field| field.directory_id() == directory_id)
            .map(DirectoryField::id)
            .collect();
        let enablements: HashSet<CompanyDirectoryId> = state
            .company_directories
            .iter()
            .filter(|enablement| enablement.directory_id == directory_id)
            .map(|enablement| enablement.id)
            .collect();

        state
            .values
            .retain(|value| !field_ids.contains(&value.field_id));
        state
            .fields
            .retain(|field| field.directory_id() != directory_id);
        state
            .records
            .retain(|record| !enablements.contains(&record.company_directory_id()));
        state
            .company_directories
            .retain(|enablement| enablement.directory_id != directory_id);
        state
            .directories
            .retain(|directory| directory.id() != directory_id);
        Ok(())
    }

    async fn save_field(&self, field: DirectoryField) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.fields.iter().any(|stored| {
            stored.directory_id() == field.directory_id()
                && stored.name() == field.name()
                && stored.id() != field.id()
        }) {
            return Err(AppError::Conflict(format!(
                "field '{}' already exists",
                field.name().as_str()
            )));
        }

        match state
            .fields
            .iter_mut()
            .find(|stored| stored.id() == field.id())
        {
            Some(stored) => *stored = field,
            None => state.fields.push(field),
        }
        Ok(())
    }

    async fn find_field(&self, field_id: FieldId) -> AppResult<Option<DirectoryField>> {
        let state = self.state.lock().await;
        Ok(state
            .fields
            .iter()
            .find(|field| field.id() == field_id)
            .cloned())
    }

    async fn list_fields(&self, directory_id: DirectoryId) -> AppResult<Vec<DirectoryField>> {
        let state = self.state.lock().await;
        Ok(state
            .fields
            .iter()
            .filter(|field| field.directory_id() == directory_id)
            .cloned()
            .collect())
    }

    async fn list_referencing_fields(
        &self,
        directory_id: DirectoryId,
    ) -> AppResult<Vec<DirectoryField>> {
        let state = self.state.lock().await;
        Ok(state
            .fields
            .iter()
            .filter(|field| {
                field.directory_id() != directory_id
                    && (field.relation_id() == Some(directory_id)
                        || field.cascading_target() == Some(directory_id))
            })
            .cloned()
            .collect())
    }

    async fn list_cascading_trigger_fields(&self) -> AppResult<Vec<DirectoryField>> {
        let state = self.state.lock().await;
        Ok(state
            .fields
            .iter()
            .filter(|field| field.cascading_target().is_some())
            .cloned()
            .collect())
    }

    async fn delete_field(&self, field_id: FieldId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.values.retain(|value| value.field_id != field_id);
        state.fields.retain(|field| field.id() != field_id);
        Ok(())
    }
}

#[async_trait]
impl RecordRepository for FakeStore {
    async fn create_record(
        &self,
        record: DirectoryRecord,
        values: Vec<DirectoryValue>,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        for value in values {
            state.values.push(StoredValue {
                value_id: value.id(),
                record_id: value.record_id(),
                field_id: value.field_id(),
                value: value.storage_text(),
            });
        }
        state.records.push(record);
        Ok(())
    }

    async fn find_record(
        &self,
        record_id: RecordId,
    ) -> AppResult<Option<DirectoryRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .iter()
            .find(|record| record.id() == record_id)
            .cloned())
    }

    async fn list_values(&self, record_ids: &[RecordId]) -> AppResult<Vec<StoredValue>> {
        let state = self.state.lock().await;
        Ok(state
            .values
            .iter()
            .filter(|value| record_ids.contains(&value.record_id))
            .cloned()
            .collect())
    }

    async fn update_value(
        &self,
        record_id: RecordId,
        field_id: FieldId,
        value: String,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let stored = state
            .values
            .iter_mut()
            .find(|stored| stored.record_id == record_id && stored.field_id == field_id)
            .ok_or_else(|| AppError::NotFound("value not found".to_owned()))?;
        stored.value = value;
        Ok(())
    }

    async fn delete_record(&self, record_id: RecordId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.values.retain(|value| value.record_id != record_id);
        state.records.retain(|record| record.id() != record_id);
        Ok(())
    }

    async fn list_records(
        &self,
        company_directory_id: CompanyDirectoryId,
        filters: &[RecordFilter],
    ) -> AppResult<Vec<DirectoryRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .iter()
            .filter(|record| record.company_directory_id() == company_directory_id)
            .filter(|record| {
                filters.iter().all(|filter| {
                    state.values.iter().any(|value| {
                        value.record_id == record.id()
                            && value.field_id == filter.field_id
                            && filter.values.contains(&value.value)
                    })
                })
            })
            .cloned()
            .collect())
    }

    async fn record_exists_in_directory(
        &self,
        record_id: RecordId,
        directory_id: DirectoryId,
        company_id: CompanyId,
    ) -> AppResult<bool> {
        let state = self.state.lock().await;
        Ok(state.records.iter().any(|record| {
            record.id() == record_id
                && state.company_directories.iter().any(|enablement| {
                    enablement.id == record.company_directory_id()
                        && enablement.directory_id == directory_id
                        && enablement.company_id == company_id
                })
        }))
    }
}

#[async_trait]
impl CompanyRepository for FakeStore {
    async fn save_company(&self, company: Company) -> AppResult<()> {
        self.state.lock().await.companies.push(company);
        Ok(())
    }

    async fn find_company(&self, company_id: CompanyId) -> AppResult<Option<Company>> {
        let state = self.state.lock().await;
        Ok(state
            .companies
            .iter()
            .find(|company| company.id() == company_id)
            .cloned())
    }

    async fn delete_company(&self, company_id: CompanyId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let enablements: HashSet<CompanyDirectoryId> = state
            .company_directories
            .iter()
            .filter(|enablement| enablement.company_id == company_id)
            .map(|enablement| enablement.id)
            .collect();
        let record_ids: HashSet<RecordId> = state
            .records
            .iter()
            .filter(|record| enablements.contains(&record.company_directory_id()))
            .map(DirectoryRecord::id)
            .collect();

        state
            .values
            .retain(|value| !record_ids.contains(&value.record_id));
        state
            .records
            .retain(|record| !record_ids.contains(&record.id()));
        state
            .company_directories
            .retain(|enablement| enablement.company_id != company_id);
        state
            .company_modules
            .retain(|enablement| enablement.company_id != company_id);
        state.companies.retain(|company| company.id() != company_id);
        Ok(())
    }

    async fn save_module(&self, module: Module) -> AppResult<()> {
        self.state.lock().await.modules.push(module);
        Ok(())
    }

    async fn find_module(&self, module_id: ModuleId) -> AppResult<Option<Module>> {
        let state = self.state.lock().await;
        Ok(state
            .modules
            .iter()
            .find(|module| module.id() == module_id)
            .cloned())
    }

    async fn save_company_module(&self, company_module: CompanyModule) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.company_modules.iter().any(|stored| {
            stored.company_id == company_module.company_id
                && stored.module_id == company_module.module_id
        }) {
            return Err(AppError::Conflict("module already enabled".to_owned()));
        }
        state.company_modules.push(company_module);
        Ok(())
    }

    async fn find_company_module(
        &self,
        company_module_id: CompanyModuleId,
    ) -> AppResult<Option<CompanyModule>> {
        let state = self.state.lock().await;
        Ok(state
            .company_modules
            .iter()
            .find(|enablement| enablement.id == company_module_id)
            .copied())
    }

    async fn save_company_directory(&self, company_directory: CompanyDirectory) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.company_directories.iter().any(|stored| {
            stored.company_id == company_directory.company_id
                && stored.directory_id == company_directory.directory_id
        }) {
            return Err(AppError::Conflict("directory already enabled".to_owned()));
        }
        state.company_directories.push(company_directory);
        Ok(())
    }

    async fn find_company_directory(
        &self,
        company_directory_id: CompanyDirectoryId,
    ) -> AppResult<Option<CompanyDirectory>> {
        let state = self.state.lock().await;
        Ok(state
            .company_directories
            .iter()
            .find(|enablement| enablement.id == company_directory_id)
            .copied())
    }

    async fn find_company_directory_for(
        &self,
        company_id: CompanyId,
        directory_id: DirectoryId,
    ) -> AppResult<Option<CompanyDirectory>> {
        let state = self.state.lock().await;
        Ok(state
            .company_directories
            .iter()
            .find(|enablement| {
                enablement.company_id == company_id && enablement.directory_id == directory_id
            })
            .copied())
    }

    async fn list_company_directories(
        &self,
        company_id: CompanyId,
    ) -> AppResult<Vec<CompanyDirectory>> {
        let state = self.state.lock().await;
        Ok(state
            .company_directories
            .iter()
            .filter(|enablement| enablement.company_id == company_id)
            .copied()
            .collect())
    }
}

#[derive(Default)]
struct SecurityState {
    permissions: Vec<Permission>,
    roles: Vec<UserRole>,
    grants: Vec<RolePermission>,
    assignments: Vec<UserRoleAssignment>,
}

/// Fake security repository keeping rows in insertion order.
#[derive(Default)]
pub(crate) struct FakeSecurityRepository {
    state: Mutex<SecurityState>,
}

#[async_trait]
impl SecurityRepository for FakeSecurityRepository {
    async fn save_permission(&self, permission: Permission) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state
            .permissions
            .iter()
            .any(|stored| stored.name() == permission.name())
        {
            return Err(AppError::Conflict("permission already exists".to_owned()));
        }
        state.permissions.push(permission);
        Ok(())
    }

    async fn find_permission(
        &self,
        permission_id: PermissionId,
    ) -> AppResult<Option<Permission>> {
        let state = self.state.lock().await;
        Ok(state
            .permissions
            .iter()
            .find(|permission| permission.id() == permission_id)
            .cloned())
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        Ok(self.state.lock().await.permissions.clone())
    }

    async fn save_role(&self, role: UserRole) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.roles.iter().any(|stored| stored.name() == role.name()) {
            return Err(AppError::Conflict("role already exists".to_owned()));
        }
        state.roles.push(role);
        Ok(())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<UserRole>> {
        let state = self.state.lock().await;
        Ok(state.roles.iter().find(|role| role.id() == role_id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<UserRole>> {
        let state = self.state.lock().await;
        Ok(state
            .roles
            .iter()
            .find(|role| role.name().as_str() == name)
            .cloned())
    }

    async fn list_roles(&self) -> AppResult<Vec<UserRole>> {
        Ok(self.state.lock().await.roles.clone())
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.grants.retain(|grant| grant.role_id() != role_id);
        state
            .assignments
            .retain(|assignment| assignment.role_id != role_id);
        state.roles.retain(|role| role.id() != role_id);
        Ok(())
    }

    async fn find_grant(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<Option<RolePermission>> {
        let state = self.state.lock().await;
        Ok(state
            .grants
            .iter()
            .find(|grant| grant.role_id() == role_id && grant.permission_id() == permission_id)
            .cloned())
    }

    async fn insert_grant(&self, grant: RolePermission) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.grants.iter().any(|stored| {
            stored.role_id() == grant.role_id() && stored.permission_id() == grant.permission_id()
        }) {
            return Err(AppError::DuplicateGrant("grant already exists".to_owned()));
        }
        state.grants.push(grant);
        Ok(())
    }

    async fn replace_grant(&self, grant: RolePermission) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.grants.retain(|stored| {
            !(stored.role_id() == grant.role_id()
                && stored.permission_id() == grant.permission_id())
        });
        state.grants.push(grant);
        Ok(())
    }

    async fn delete_grant(&self, role_id: RoleId, permission_id: PermissionId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.grants.retain(|grant| {
            !(grant.role_id() == role_id && grant.permission_id() == permission_id)
        });
        Ok(())
    }

    async fn list_grants(&self, role_id: RoleId) -> AppResult<Vec<RolePermission>> {
        let state = self.state.lock().await;
        Ok(state
            .grants
            .iter()
            .filter(|grant| grant.role_id() == role_id)
            .cloned()
            .collect())
    }

    async fn list_role_grants(&self, role_ids: &[RoleId]) -> AppResult<Vec<RoleGrant>> {
        let state = self.state.lock().await;
        Ok(state
            .grants
            .iter()
            .filter(|grant| role_ids.contains(&grant.role_id()))
            .filter_map(|grant| {
                state
                    .permissions
                    .iter()
                    .find(|permission| permission.id() == grant.permission_id())
                    .map(|permission| RoleGrant {
                        grant: grant.clone(),
                        permission: permission.clone(),
                    })
            })
            .collect())
    }

    async fn assign_role(&self, assignment: UserRoleAssignment) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if !state.assignments.contains(&assignment) {
            state.assignments.push(assignment);
        }
        Ok(())
    }

    async fn unassign_role(&self, assignment: UserRoleAssignment) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.assignments.retain(|stored| stored != &assignment);
        Ok(())
    }

    async fn list_assigned_roles(&self, user_id: UserId) -> AppResult<Vec<AssignedRole>> {
        let state = self.state.lock().await;
        Ok(state
            .assignments
            .iter()
            .filter(|assignment| assignment.user_id == user_id)
            .filter_map(|assignment| {
                state
                    .roles
                    .iter()
                    .find(|role| role.id() == assignment.role_id)
                    .map(|role| AssignedRole {
                        company_id: assignment.company_id,
                        role: role.clone(),
                    })
            })
            .collect())
    }

    async fn detach_company_assignments(&self, company_id: CompanyId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        for assignment in &mut state.assignments {
            if assignment.company_id == Some(company_id) {
                assignment.company_id = None;
            }
        }
        Ok(())
    }
}

/// Audit repository capturing every appended event.
#[derive(Default)]
pub(crate) struct RecordingAuditRepository {
    pub(crate) events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditRepository for RecordingAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

/// Wired fakes plus an actor holding the super admin role.
pub(crate) struct Harness {
    pub(crate) store: Arc<FakeStore>,
    pub(crate) security: Arc<FakeSecurityRepository>,
    pub(crate) audit: Arc<RecordingAuditRepository>,
    pub(crate) authorization: AuthorizationService,
    pub(crate) resolver: CascadingResolver,
    pub(crate) admin: UserIdentity,
}

impl Harness {
    pub(crate) async fn new() -> Self {
        let store = Arc::new(FakeStore::default());
        let security = Arc::new(FakeSecurityRepository::default());
        let audit = Arc::new(RecordingAuditRepository::default());
        let authorization = AuthorizationService::new(security.clone());
        let resolver = CascadingResolver::new(store.clone());

        let admin = UserIdentity::new(UserId::new(), "admin", None);
        let super_admin = UserRole::new(RoleId::new(), SUPER_ADMIN_ROLE, true)
            .unwrap_or_else(|_| unreachable!());
        let assigned = async {
            security.save_role(super_admin.clone()).await?;
            security
                .assign_role(UserRoleAssignment {
                    user_id: admin.user_id(),
                    role_id: super_admin.id(),
                    company_id: None,
                })
                .await
        }
        .await;
        assert!(assigned.is_ok());

        Self {
            store,
            security,
            audit,
            authorization,
            resolver,
            admin,
        }
    }

    /// Creates a user holding one role with one grant.
    pub(crate) async fn user_with_grant(
        &self,
        permission_type: PermissionType,
        directory_id: Option<DirectoryId>,
        company_id: Option<CompanyId>,
        constraint_data: Option<Value>,
    ) -> UserIdentity {
        let user = UserIdentity::new(UserId::new(), "member", company_id);
        let role = UserRole::new(RoleId::new(), format!("role-{}", RoleId::new()), false)
            .unwrap_or_else(|_| unreachable!());
        let permission = Permission::new(
            PermissionId::new(),
            format!("permission-{}", PermissionId::new()),
            permission_type,
            None,
            directory_id,
        )
        .unwrap_or_else(|_| unreachable!());
        let grant = RolePermission::new(role.id(), permission.id(), None, None, constraint_data)
            .unwrap_or_else(|_| unreachable!());

        let seeded = async {
            self.security.save_role(role.clone()).await?;
            self.security.save_permission(permission).await?;
            self.security.insert_grant(grant).await?;
            self.security
                .assign_role(UserRoleAssignment {
                    user_id: user.user_id(),
                    role_id: role.id(),
                    company_id,
                })
                .await
        }
        .await;
        assert!(seeded.is_ok());

        user
    }

    /// Seeds a directory directly in the store.
    pub(crate) async fn directory(&self, name: &str) -> Directory {
        let directory = Directory::new(
            DirectoryId::new(),
            name,
            None,
            DirectoryType::Company,
            Value::Null,
        )
        .unwrap_or_else(|_| unreachable!());
        let saved = self.store.save_directory(directory.clone()).await;
        assert!(saved.is_ok());
        directory
    }

    /// Seeds a company with one module and enables `directory_id` under it.
    pub(crate) async fn enable(
        &self,
        company_id: CompanyId,
        directory_id: DirectoryId,
    ) -> CompanyDirectory {
        if self
            .store
            .find_company(company_id)
            .await
            .ok()
            .flatten()
            .is_none()
        {
            let company =
                Company::new(company_id, "Acme").unwrap_or_else(|_| unreachable!());
            assert!(self.store.save_company(company).await.is_ok());
        }

        let module = Module::new(ModuleId::new(), format!("module-{}", ModuleId::new()))
            .unwrap_or_else(|_| unreachable!());
        let company_module = CompanyModule {
            id: CompanyModuleId::new(),
            company_id,
            module_id: module.id(),
        };
        let company_directory = CompanyDirectory {
            id: CompanyDirectoryId::new(),
            company_id,
            directory_id,
            company_module_id: company_module.id,
        };

        let seeded = async {
            self.store.save_module(module).await?;
            self.store.save_company_module(company_module).await?;
            self.store.save_company_directory(company_directory).await
        }
        .await;
        assert!(seeded.is_ok());

        company_directory
    }
}
