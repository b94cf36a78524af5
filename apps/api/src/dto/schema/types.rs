use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_core::{DirectoryId, FieldId};

/// Incoming payload for directory creation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDirectoryRequest {
    pub name: String,
    pub icon: Option<String>,
    pub directory_type: String,
    #[serde(default)]
    pub metadata: Value,
}

/// API representation of a directory.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryResponse {
    pub id: DirectoryId,
    pub name: String,
    pub icon: Option<String>,
    pub directory_type: String,
    pub metadata: Value,
    pub is_protected: bool,
}

/// Incoming payload for field definition.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefineFieldRequest {
    pub name: String,
    pub field_type: String,
    pub relation_id: Option<DirectoryId>,
    #[serde(default)]
    pub metadata: Value,
}

/// Incoming payload for field metadata replacement.
#[derive(Debug, Deserialize)]
pub struct UpdateFieldMetadataRequest {
    pub metadata: Value,
}

/// API representation of a directory field.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldResponse {
    pub id: FieldId,
    pub directory_id: DirectoryId,
    pub name: String,
    pub field_type: String,
    pub relation_id: Option<DirectoryId>,
    pub metadata: Value,
}

/// Trigger value whose dependents should be resolved.
#[derive(Debug, Deserialize)]
pub struct ResolveDependentsRequest {
    pub value: Value,
}

/// Source of the values a dependent directory is narrowed by.
#[derive(Debug, Serialize)]
#[serde(
    tag = "kind",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum FilterBindingResponse {
    Value {
        value: Value,
    },
    Upstream {
        directory_id: DirectoryId,
        field_id: FieldId,
    },
}

/// API representation of one resolved cascading dependent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadingDependentResponse {
    pub dependent_directory_id: DirectoryId,
    pub trigger_field_id: FieldId,
    pub field_name: String,
    pub binding: FilterBindingResponse,
    pub depth: usize,
}
