use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tessera_core::{AppError, AppResult, DirectoryId, FieldId, UserIdentity};
use tessera_domain::{
    AuditAction, Directory, DirectoryField, FieldMetadata, PermissionType, ResourceScope,
    order_fields,
};
use tracing::info;

use crate::audit_ports::{AuditEvent, AuditRepository};
use crate::authorization_service::AuthorizationService;
use crate::cascading_resolver::CascadingResolver;
use crate::schema_ports::{CreateDirectoryInput, DefineFieldInput, DirectoryRepository};

/// Application service for directory and field definitions.
#[derive(Clone)]
pub struct DirectorySchemaService {
    directories: Arc<dyn DirectoryRepository>,
    authorization_service: AuthorizationService,
    audit_repository: Arc<dyn AuditRepository>,
    resolver: CascadingResolver,
}

impl DirectorySchemaService {
    /// Creates a new schema service.
    #[must_use]
    pub fn new(
        directories: Arc<dyn DirectoryRepository>,
        authorization_service: AuthorizationService,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        let resolver = CascadingResolver::new(directories.clone());
        Self {
            directories,
            authorization_service,
            audit_repository,
            resolver,
        }
    }

    /// Creates a directory definition.
    pub async fn create_directory(
        &self,
        actor: &UserIdentity,
        input: CreateDirectoryInput,
    ) -> AppResult<Directory> {
        self.authorization_service
            .require_global(actor, PermissionType::Manage, &ResourceScope::global())
            .await?;

        let directory = Directory::new(
            DirectoryId::new(),
            input.name,
            input.icon,
            input.directory_type,
            input.metadata,
        )?;
        self.directories.save_directory(directory.clone()).await?;

        info!(
            directory_id = %directory.id(),
            directory_type = directory.directory_type().as_str(),
            "directory created"
        );
        self.audit(
            actor,
            AuditAction::DirectoryCreated,
            "directory",
            directory.id().to_string(),
            format!("created directory '{}'", directory.name().as_str()),
        )
        .await?;

        Ok(directory)
    }

    /// Lists the directories the actor may read.
    pub async fn list_directories(&self, actor: &UserIdentity) -> AppResult<Vec<Directory>> {
        let authorizer = self
            .authorization_service
            .authorizer(actor.user_id(), Utc::now())
            .await?;

        Ok(self
            .directories
            .list_directories()
            .await?
            .into_iter()
            .filter(|directory| {
                authorizer
                    .decide(PermissionType::Read, &directory_scope(actor, directory.id()))
                    .is_allowed()
            })
            .collect())
    }

    /// Returns one directory definition.
    pub async fn get_directory(
        &self,
        actor: &UserIdentity,
        directory_id: DirectoryId,
    ) -> AppResult<Directory> {
        self.authorization_service
            .require(
                actor,
                PermissionType::Read,
                &directory_scope(actor, directory_id),
            )
            .await?;

        self.require_directory(directory_id).await
    }

    /// Deletes a directory with its fields, values, enablements and records.
    ///
    /// System directories and directories referenced by other directories' fields are kept.
    pub async fn delete_directory(
        &self,
        actor: &UserIdentity,
        directory_id: DirectoryId,
    ) -> AppResult<()> {
        self.authorization_service
            .require_global(
                actor,
                PermissionType::Manage,
                &ResourceScope::directory(directory_id),
            )
            .await?;

        let directory = self.require_directory(directory_id).await?;
        if directory.is_protected() {
            return Err(AppError::Conflict(format!(
                "system directory '{}' cannot be deleted",
                directory.name().as_str()
            )));
        }

        let referencing = self.directories.list_referencing_fields(directory_id).await?;
        if let Some(field) = referencing.first() {
            return Err(AppError::Conflict(format!(
                "directory '{}' is referenced by field '{}' of directory '{}'",
                directory.name().as_str(),
                field.name().as_str(),
                field.directory_id()
            )));
        }

        self.directories.delete_directory(directory_id).await?;

        info!(directory_id = %directory_id, "directory deleted");
        self.audit(
            actor,
            AuditAction::DirectoryDeleted,
            "directory",
            directory_id.to_string(),
            format!("deleted directory '{}'", directory.name().as_str()),
        )
        .await
    }

    /// Defines a new field on a directory.
    pub async fn define_field(
        &self,
        actor: &UserIdentity,
        input: DefineFieldInput,
    ) -> AppResult<DirectoryField> {
        self.authorization_service
            .require_global(
                actor,
                PermissionType::Manage,
                &ResourceScope::directory(input.directory_id),
            )
            .await?;
        self.require_directory(input.directory_id).await?;

        let field = DirectoryField::new(
            FieldId::new(),
            input.directory_id,
            input.name,
            input.field_type,
            input.relation_id,
            FieldMetadata::from_json(input.metadata)?,
        )?;

        let existing = self.directories.list_fields(field.directory_id()).await?;
        if existing
            .iter()
            .any(|stored| stored.name() == field.name())
        {
            return Err(AppError::Conflict(format!(
                "field '{}' already exists in directory '{}'",
                field.name().as_str(),
                field.directory_id()
            )));
        }

        self.save_validated_field(actor, field).await
    }

    /// Replaces the metadata of a field, re-validating its cascading configuration.
    pub async fn update_field_metadata(
        &self,
        actor: &UserIdentity,
        field_id: FieldId,
        metadata: Value,
    ) -> AppResult<DirectoryField> {
        let field = self.require_field(field_id).await?;
        self.authorization_service
            .require_global(
                actor,
                PermissionType::Manage,
                &ResourceScope::directory(field.directory_id()),
            )
            .await?;

        let field = field.with_metadata(FieldMetadata::from_json(metadata)?)?;
        self.save_validated_field(actor, field).await
    }

    /// Lists directory fields by `fieldOrder`, unordered fields last in creation order.
    pub async fn list_fields(
        &self,
        actor: &UserIdentity,
        directory_id: DirectoryId,
    ) -> AppResult<Vec<DirectoryField>> {
        self.authorization_service
            .require(
                actor,
                PermissionType::Read,
                &directory_scope(actor, directory_id),
            )
            .await?;
        self.require_directory(directory_id).await?;

        let mut fields = self.directories.list_fields(directory_id).await?;
        order_fields(&mut fields);
        Ok(fields)
    }

    /// Deletes a field and every value bound to it.
    pub async fn delete_field(&self, actor: &UserIdentity, field_id: FieldId) -> AppResult<()> {
        let field = self.require_field(field_id).await?;
        self.authorization_service
            .require_global(
                actor,
                PermissionType::Manage,
                &ResourceScope::directory(field.directory_id()),
            )
            .await?;

        self.directories.delete_field(field_id).await?;

        info!(field_id = %field_id, directory_id = %field.directory_id(), "field deleted");
        self.audit(
            actor,
            AuditAction::FieldDeleted,
            "directory_field",
            field_id.to_string(),
            format!("deleted field '{}'", field.name().as_str()),
        )
        .await
    }

    async fn save_validated_field(
        &self,
        actor: &UserIdentity,
        field: DirectoryField,
    ) -> AppResult<DirectoryField> {
        if let Some(relation_id) = field.relation_id()
            && self.directories.find_directory(relation_id).await?.is_none()
        {
            return Err(AppError::Validation(format!(
                "relation target directory '{relation_id}' does not exist"
            )));
        }

        if let Some(target) = field.cascading_target() {
            if self.directories.find_directory(target).await?.is_none() {
                return Err(AppError::Validation(format!(
                    "cascading target directory '{target}' does not exist"
                )));
            }
            self.resolver.ensure_acyclic(&field).await?;
        }

        self.directories.save_field(field.clone()).await?;

        info!(
            field_id = %field.id(),
            directory_id = %field.directory_id(),
            field_type = field.field_type().as_str(),
            "field saved"
        );
        self.audit(
            actor,
            AuditAction::FieldSaved,
            "directory_field",
            field.id().to_string(),
            format!(
                "saved field '{}' of type '{}'",
                field.name().as_str(),
                field.field_type().as_str()
            ),
        )
        .await?;

        Ok(field)
    }

    async fn require_directory(&self, directory_id: DirectoryId) -> AppResult<Directory> {
        self.directories
            .find_directory(directory_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("directory '{directory_id}' does not exist")))
    }

    async fn require_field(&self, field_id: FieldId) -> AppResult<DirectoryField> {
        self.directories
            .find_field(field_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("field '{field_id}' does not exist")))
    }

    async fn audit(
        &self,
        actor: &UserIdentity,
        action: AuditAction,
        resource_type: &str,
        resource_id: String,
        detail: String,
    ) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                company_id: actor.company_id(),
                user_id: actor.user_id(),
                action,
                resource_type: resource_type.to_owned(),
                resource_id,
                detail: Some(detail),
            })
            .await
    }
}

fn directory_scope(actor: &UserIdentity, directory_id: DirectoryId) -> ResourceScope {
    ResourceScope {
        company_id: actor.company_id(),
        ..ResourceScope::directory(directory_id)
    }
}
