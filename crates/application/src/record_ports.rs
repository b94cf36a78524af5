use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tessera_core::{
    AppResult, CompanyDirectoryId, CompanyId, DirectoryId, FieldId, RecordId, ValueId,
};
use tessera_domain::{DirectoryRecord, DirectoryValue};

/// Input payload for record creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRecordInput {
    /// Company directory owning the record.
    pub company_directory_id: CompanyDirectoryId,
    /// Raw attribute values keyed by field name; `null` entries are skipped.
    pub values: BTreeMap<String, Value>,
    /// Free-form record metadata object.
    pub metadata: Value,
}

/// Persisted attribute row before it is cast back to its field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    /// Value identifier.
    pub value_id: ValueId,
    /// Owning record.
    pub record_id: RecordId,
    /// Bound field.
    pub field_id: FieldId,
    /// Canonical text form.
    pub value: String,
}

/// Attribute filter matching any of the listed canonical texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    /// Field compared by the filter.
    pub field_id: FieldId,
    /// Accepted canonical texts.
    pub values: Vec<String>,
}

/// Repository port for EAV record persistence.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Persists a record and its values atomically.
    async fn create_record(
        &self,
        record: DirectoryRecord,
        values: Vec<DirectoryValue>,
    ) -> AppResult<()>;

    /// Finds a record header by identifier.
    async fn find_record(&self, record_id: RecordId) -> AppResult<Option<DirectoryRecord>>;

    /// Lists stored values for the given records.
    async fn list_values(&self, record_ids: &[RecordId]) -> AppResult<Vec<StoredValue>>;

    /// Replaces the text of an existing value; fails with `NotFound` when absent.
    async fn update_value(
        &self,
        record_id: RecordId,
        field_id: FieldId,
        value: String,
    ) -> AppResult<()>;

    /// Deletes a record together with its values.
    async fn delete_record(&self, record_id: RecordId) -> AppResult<()>;

    /// Lists records of a company directory matching every filter, oldest first.
    async fn list_records(
        &self,
        company_directory_id: CompanyDirectoryId,
        filters: &[RecordFilter],
    ) -> AppResult<Vec<DirectoryRecord>>;

    /// Returns whether the record belongs to the enablement of `directory_id` for `company_id`.
    async fn record_exists_in_directory(
        &self,
        record_id: RecordId,
        directory_id: DirectoryId,
        company_id: CompanyId,
    ) -> AppResult<bool>;
}
