use async_trait::async_trait;
use serde_json::Value;
use tessera_core::{AppResult, DirectoryId, FieldId};
use tessera_domain::{Directory, DirectoryField, DirectoryType, FieldType};

/// Input payload for directory creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateDirectoryInput {
    /// Display name, unique across directories.
    pub name: String,
    /// Optional icon key.
    pub icon: Option<String>,
    /// Ownership class.
    pub directory_type: DirectoryType,
    /// Free-form metadata object.
    pub metadata: Value,
}

/// Input payload for field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct DefineFieldInput {
    /// Owning directory.
    pub directory_id: DirectoryId,
    /// Field name, unique within the directory.
    pub name: String,
    /// Declared value type.
    pub field_type: FieldType,
    /// Related directory for relation fields.
    pub relation_id: Option<DirectoryId>,
    /// Presentation and cascading metadata as JSON.
    pub metadata: Value,
}

/// Repository port for directory schema persistence.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    /// Saves a new directory; names are unique.
    async fn save_directory(&self, directory: Directory) -> AppResult<()>;

    /// Finds a directory by identifier.
    async fn find_directory(&self, directory_id: DirectoryId) -> AppResult<Option<Directory>>;

    /// Lists every directory ordered by name.
    async fn list_directories(&self) -> AppResult<Vec<Directory>>;

    /// Deletes a directory, its fields with their values, and its company enablements with
    /// their records.
    async fn delete_directory(&self, directory_id: DirectoryId) -> AppResult<()>;

    /// Inserts a field or replaces the field with the same identifier.
    async fn save_field(&self, field: DirectoryField) -> AppResult<()>;

    /// Finds a field by identifier.
    async fn find_field(&self, field_id: FieldId) -> AppResult<Option<DirectoryField>>;

    /// Lists the fields of a directory in creation order.
    async fn list_fields(&self, directory_id: DirectoryId) -> AppResult<Vec<DirectoryField>>;

    /// Lists fields of other directories that reference `directory_id` through a relation or
    /// an enabled cascading trigger.
    async fn list_referencing_fields(
        &self,
        directory_id: DirectoryId,
    ) -> AppResult<Vec<DirectoryField>>;

    /// Lists every field configured as an enabled cascading trigger.
    async fn list_cascading_trigger_fields(&self) -> AppResult<Vec<DirectoryField>>;

    /// Deletes a field and every value bound to it.
    async fn delete_field(&self, field_id: FieldId) -> AppResult<()>;
}
