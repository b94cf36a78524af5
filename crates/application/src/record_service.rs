use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tessera_core::{
    AppError, AppResult, CompanyDirectoryId, CompanyId, DirectoryId, FieldId, RecordId,
    UserIdentity, ValueId,
};
use tessera_domain::{
    AuditAction, CompanyDirectory, DirectoryField, DirectoryRecord, DirectoryValue, FieldValue,
    PermissionType, ResourceScope,
};
use tracing::{debug, info};

use crate::audit_ports::{AuditEvent, AuditRepository};
use crate::authorization_service::{AuthorizationService, FieldAccess};
use crate::cascading_resolver::{CascadingDependent, CascadingResolver, FilterBinding};
use crate::record_ports::{CreateRecordInput, RecordFilter, RecordRepository, StoredValue};
use crate::schema_ports::DirectoryRepository;
use crate::tenancy_ports::CompanyRepository;

/// Record with its attributes cast back to their field types.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordView {
    /// Record identifier.
    pub id: RecordId,
    /// Owning company directory.
    pub company_directory_id: CompanyDirectoryId,
    /// Free-form record metadata.
    pub metadata: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Typed values keyed by field name.
    pub values: BTreeMap<String, FieldValue>,
}

/// Result of replacing one record value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueUpdate {
    /// Stored value.
    pub value: FieldValue,
    /// Dependents to recompute after the write.
    pub dependents: Vec<CascadingDependent>,
}

/// Records of one dependent directory that satisfy its cascading filter.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadingOptions {
    /// Resolved dependency.
    pub dependent: CascadingDependent,
    /// Matching records of the company.
    pub records: Vec<RecordView>,
}

/// Application service for EAV records and their values.
#[derive(Clone)]
pub struct RecordService {
    directories: Arc<dyn DirectoryRepository>,
    records: Arc<dyn RecordRepository>,
    companies: Arc<dyn CompanyRepository>,
    authorization_service: AuthorizationService,
    audit_repository: Arc<dyn AuditRepository>,
    resolver: CascadingResolver,
}

impl RecordService {
    /// Creates a new record service.
    #[must_use]
    pub fn new(
        directories: Arc<dyn DirectoryRepository>,
        records: Arc<dyn RecordRepository>,
        companies: Arc<dyn CompanyRepository>,
        authorization_service: AuthorizationService,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        let resolver = CascadingResolver::new(directories.clone());
        Self {
            directories,
            records,
            companies,
            authorization_service,
            audit_repository,
            resolver,
        }
    }

    /// Creates a record, casting every named value to its field type.
    pub async fn create_record(
        &self,
        actor: &UserIdentity,
        input: CreateRecordInput,
    ) -> AppResult<RecordView> {
        let (enablement, scope) = self.enablement(input.company_directory_id).await?;
        let access = self
            .authorization_service
            .require_field_access(actor, PermissionType::Write, &scope)
            .await?;
        let fields = self.directories.list_fields(enablement.directory_id).await?;

        let record_id = RecordId::new();
        let mut values = Vec::with_capacity(input.values.len());
        for (name, raw) in &input.values {
            let field = field_named(&fields, name)?;
            ensure_permitted(&access, field)?;
            if raw.is_null() {
                continue;
            }

            let value = DirectoryValue::for_field(ValueId::new(), record_id, field, raw)?;
            self.ensure_relation_target(enablement.company_id, field, value.value())
                .await?;
            values.push(value);
        }

        let record = DirectoryRecord::new(record_id, enablement.id, input.metadata, Utc::now())?;
        self.records
            .create_record(record.clone(), values.clone())
            .await?;

        info!(
            record_id = %record_id,
            company_directory_id = %enablement.id,
            value_count = values.len(),
            "record created"
        );
        self.audit(
            actor,
            enablement.company_id,
            AuditAction::RecordCreated,
            record_id,
            format!("created record in directory '{}'", enablement.directory_id),
        )
        .await?;

        let values = values
            .into_iter()
            .filter_map(|value| {
                fields
                    .iter()
                    .find(|field| field.id() == value.field_id())
                    .map(|field| (field.name().as_str().to_owned(), value.value().clone()))
            })
            .collect();
        Ok(view(&record, values))
    }

    /// Returns a record with the attributes the actor may read.
    pub async fn get_record(
        &self,
        actor: &UserIdentity,
        record_id: RecordId,
    ) -> AppResult<RecordView> {
        let record = self.require_record(record_id).await?;
        let (enablement, scope) = self.enablement(record.company_directory_id()).await?;
        let access = self
            .authorization_service
            .require_field_access(actor, PermissionType::Read, &scope)
            .await?;
        let fields = self.directories.list_fields(enablement.directory_id).await?;

        let mut views = self.views(vec![record], &fields, &access).await?;
        views
            .pop()
            .ok_or_else(|| AppError::Internal(format!("record '{record_id}' lost its view")))
    }

    /// Replaces the value of one field and returns the dependents to recompute.
    ///
    /// Values are never inserted implicitly; a missing value fails with `NotFound`.
    pub async fn update_value(
        &self,
        actor: &UserIdentity,
        record_id: RecordId,
        field_id: FieldId,
        raw_value: Value,
    ) -> AppResult<ValueUpdate> {
        let record = self.require_record(record_id).await?;
        let (enablement, scope) = self.enablement(record.company_directory_id()).await?;
        let access = self
            .authorization_service
            .require_field_access(actor, PermissionType::Write, &scope)
            .await?;

        let field = self
            .directories
            .find_field(field_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("field '{field_id}' does not exist")))?;
        if field.directory_id() != enablement.directory_id {
            return Err(AppError::Validation(format!(
                "field '{}' does not belong to the record's directory",
                field.name().as_str()
            )));
        }
        ensure_permitted(&access, &field)?;

        let value = FieldValue::cast(field.field_type(), &raw_value)?;
        self.ensure_relation_target(enablement.company_id, &field, &value)
            .await?;
        self.records
            .update_value(record_id, field_id, value.to_storage_text())
            .await?;

        let dependents = self.resolver.resolve_dependents(field_id, &raw_value).await?;

        info!(
            record_id = %record_id,
            field_id = %field_id,
            dependent_count = dependents.len(),
            "record value updated"
        );
        self.audit(
            actor,
            enablement.company_id,
            AuditAction::RecordUpdated,
            record_id,
            format!("updated field '{}'", field.name().as_str()),
        )
        .await?;

        Ok(ValueUpdate { value, dependents })
    }

    /// Deletes a record and its values.
    pub async fn delete_record(&self, actor: &UserIdentity, record_id: RecordId) -> AppResult<()> {
        let record = self.require_record(record_id).await?;
        let (enablement, scope) = self.enablement(record.company_directory_id()).await?;
        self.authorization_service
            .require(actor, PermissionType::Write, &scope)
            .await?;

        self.records.delete_record(record_id).await?;

        info!(record_id = %record_id, "record deleted");
        self.audit(
            actor,
            enablement.company_id,
            AuditAction::RecordDeleted,
            record_id,
            format!("deleted record from directory '{}'", enablement.directory_id),
        )
        .await
    }

    /// Lists records matching every exact attribute filter, oldest first.
    ///
    /// Filter values use the stored text form of their field type.
    pub async fn list_records(
        &self,
        actor: &UserIdentity,
        company_directory_id: CompanyDirectoryId,
        filters: BTreeMap<String, String>,
    ) -> AppResult<Vec<RecordView>> {
        let (enablement, scope) = self.enablement(company_directory_id).await?;
        let access = self
            .authorization_service
            .require_field_access(actor, PermissionType::Read, &scope)
            .await?;
        let fields = self.directories.list_fields(enablement.directory_id).await?;

        let mut record_filters = Vec::with_capacity(filters.len());
        for (name, text) in &filters {
            let field = field_named(&fields, name)?;
            ensure_permitted(&access, field)?;
            let value = FieldValue::from_storage(field.field_type(), text)?;
            record_filters.push(RecordFilter {
                field_id: field.id(),
                values: vec![value.to_storage_text()],
            });
        }

        let records = self
            .records
            .list_records(company_directory_id, &record_filters)
            .await?;
        self.views(records, &fields, &access).await
    }

    /// Resolves the dependents narrowed when `field_id` takes `raw_value`.
    pub async fn resolve_dependents(
        &self,
        actor: &UserIdentity,
        field_id: FieldId,
        raw_value: &Value,
    ) -> AppResult<Vec<CascadingDependent>> {
        let field = self
            .directories
            .find_field(field_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("field '{field_id}' does not exist")))?;
        self.authorization_service
            .require(
                actor,
                PermissionType::Read,
                &ResourceScope {
                    company_id: actor.company_id(),
                    ..ResourceScope::directory(field.directory_id())
                },
            )
            .await?;

        self.resolver.resolve_dependents(field_id, raw_value).await
    }

    /// Materializes the dependents of a trigger value against one company's records.
    ///
    /// Chained dependents are narrowed by the values their upstream trigger takes on the
    /// upstream matching records.
    pub async fn cascading_options(
        &self,
        actor: &UserIdentity,
        company_id: CompanyId,
        field_id: FieldId,
        raw_value: &Value,
    ) -> AppResult<Vec<CascadingOptions>> {
        let dependents = self.resolve_dependents(actor, field_id, raw_value).await?;
        let mut matched: HashMap<DirectoryId, Vec<RecordId>> = HashMap::new();
        let mut options = Vec::with_capacity(dependents.len());

        for dependent in dependents {
            let records = self
                .dependent_records(actor, company_id, &dependent, &matched)
                .await?;
            matched.insert(
                dependent.dependent_directory_id,
                records.iter().map(|record| record.id).collect(),
            );
            options.push(CascadingOptions { dependent, records });
        }

        Ok(options)
    }

    async fn dependent_records(
        &self,
        actor: &UserIdentity,
        company_id: CompanyId,
        dependent: &CascadingDependent,
        matched: &HashMap<DirectoryId, Vec<RecordId>>,
    ) -> AppResult<Vec<RecordView>> {
        let Some(enablement) = self
            .companies
            .find_company_directory_for(company_id, dependent.dependent_directory_id)
            .await?
        else {
            debug!(
                company_id = %company_id,
                directory_id = %dependent.dependent_directory_id,
                "cascading dependent is not enabled for company"
            );
            return Ok(Vec::new());
        };

        let scope = self.scope_for(&enablement).await?;
        let access = self
            .authorization_service
            .require_field_access(actor, PermissionType::Read, &scope)
            .await?;
        let fields = self.directories.list_fields(enablement.directory_id).await?;
        let Some(target) = fields
            .iter()
            .find(|field| field.name().as_str() == dependent.filter.field_name)
        else {
            return Ok(Vec::new());
        };

        let accepted: Vec<String> = match &dependent.filter.binding {
            FilterBinding::Value(value) => canonical_for(target, value).into_iter().collect(),
            FilterBinding::Upstream {
                directory_id,
                field_id,
            } => {
                let upstream_records = matched.get(directory_id).cloned().unwrap_or_default();
                let Some(trigger) = self.directories.find_field(*field_id).await? else {
                    return Ok(Vec::new());
                };

                let mut accepted = Vec::new();
                for stored in self.records.list_values(&upstream_records).await? {
                    if stored.field_id != trigger.id() {
                        continue;
                    }
                    let value = FieldValue::from_storage(trigger.field_type(), &stored.value)?;
                    if let Some(text) = canonical_for(target, &value)
                        && !accepted.contains(&text)
                    {
                        accepted.push(text);
                    }
                }
                accepted
            }
        };

        if accepted.is_empty() {
            return Ok(Vec::new());
        }

        let records = self
            .records
            .list_records(
                enablement.id,
                &[RecordFilter {
                    field_id: target.id(),
                    values: accepted,
                }],
            )
            .await?;
        self.views(records, &fields, &access).await
    }

    async fn views(
        &self,
        records: Vec<DirectoryRecord>,
        fields: &[DirectoryField],
        access: &FieldAccess,
    ) -> AppResult<Vec<RecordView>> {
        let record_ids: Vec<RecordId> = records.iter().map(DirectoryRecord::id).collect();
        let mut stored_by_record: HashMap<RecordId, Vec<StoredValue>> = HashMap::new();
        for stored in self.records.list_values(&record_ids).await? {
            stored_by_record
                .entry(stored.record_id)
                .or_default()
                .push(stored);
        }

        let mut views = Vec::with_capacity(records.len());
        for record in records {
            let mut values = BTreeMap::new();
            for stored in stored_by_record.remove(&record.id()).unwrap_or_default() {
                let Some(field) = fields.iter().find(|field| field.id() == stored.field_id) else {
                    continue;
                };
                if !access.permits(field.name().as_str()) {
                    continue;
                }

                let value = DirectoryValue::from_storage(
                    stored.value_id,
                    stored.record_id,
                    field,
                    &stored.value,
                )?;
                values.insert(field.name().as_str().to_owned(), value.value().clone());
            }
            views.push(view(&record, values));
        }

        Ok(views)
    }

    /// Relation values point at records of the target directory within the same company.
    async fn ensure_relation_target(
        &self,
        company_id: CompanyId,
        field: &DirectoryField,
        value: &FieldValue,
    ) -> AppResult<()> {
        let (Some(relation_id), Some(target_record)) = (field.relation_id(), value.as_relation())
        else {
            return Ok(());
        };

        if self
            .records
            .record_exists_in_directory(target_record, relation_id, company_id)
            .await?
        {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "field '{}' references record '{target_record}' outside directory \
                 '{relation_id}' of company '{company_id}'",
                field.name().as_str()
            )))
        }
    }

    async fn require_record(&self, record_id: RecordId) -> AppResult<DirectoryRecord> {
        self.records
            .find_record(record_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("record '{record_id}' does not exist")))
    }

    async fn enablement(
        &self,
        company_directory_id: CompanyDirectoryId,
    ) -> AppResult<(CompanyDirectory, ResourceScope)> {
        let enablement = self
            .companies
            .find_company_directory(company_directory_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "company directory '{company_directory_id}' does not exist"
                ))
            })?;
        let scope = self.scope_for(&enablement).await?;
        Ok((enablement, scope))
    }

    async fn scope_for(&self, enablement: &CompanyDirectory) -> AppResult<ResourceScope> {
        let company_module = self
            .companies
            .find_company_module(enablement.company_module_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "company module '{}' does not exist",
                    enablement.company_module_id
                ))
            })?;

        Ok(ResourceScope {
            company_id: Some(enablement.company_id),
            module_id: Some(company_module.module_id),
            directory_id: Some(enablement.directory_id),
        })
    }

    async fn audit(
        &self,
        actor: &UserIdentity,
        company_id: CompanyId,
        action: AuditAction,
        record_id: RecordId,
        detail: String,
    ) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                company_id: Some(company_id),
                user_id: actor.user_id(),
                action,
                resource_type: "directory_record".to_owned(),
                resource_id: record_id.to_string(),
                detail: Some(detail),
            })
            .await
    }
}

fn view(record: &DirectoryRecord, values: BTreeMap<String, FieldValue>) -> RecordView {
    RecordView {
        id: record.id(),
        company_directory_id: record.company_directory_id(),
        metadata: record.metadata().clone(),
        created_at: record.created_at(),
        values,
    }
}

fn field_named<'a>(fields: &'a [DirectoryField], name: &str) -> AppResult<&'a DirectoryField> {
    fields
        .iter()
        .find(|field| field.name().as_str() == name)
        .ok_or_else(|| AppError::UnknownField(format!("field '{name}' is not defined")))
}

fn ensure_permitted(access: &FieldAccess, field: &DirectoryField) -> AppResult<()> {
    if access.permits(field.name().as_str()) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "field '{}' is outside the granted field set",
            field.name().as_str()
        )))
    }
}

/// Canonical text of `value` in the target field's type, when it casts.
fn canonical_for(target: &DirectoryField, value: &FieldValue) -> Option<String> {
    FieldValue::cast(target.field_type(), &value.to_json())
        .ok()
        .map(|value| value.to_storage_text())
}
