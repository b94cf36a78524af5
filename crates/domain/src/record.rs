use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tessera_core::{AppError, AppResult, CompanyDirectoryId, FieldId, RecordId, ValueId};

use crate::{DirectoryField, FieldValue};

/// One EAV row owned by a company directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    id: RecordId,
    company_directory_id: CompanyDirectoryId,
    metadata: Value,
    created_at: DateTime<Utc>,
}

impl DirectoryRecord {
    /// Creates a record header; `null` metadata becomes an empty object.
    pub fn new(
        id: RecordId,
        company_directory_id: CompanyDirectoryId,
        metadata: Value,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let metadata = match metadata {
            Value::Null => Value::Object(Map::new()),
            Value::Object(_) => metadata,
            _ => {
                return Err(AppError::Validation(
                    "record metadata must be a JSON object".to_owned(),
                ));
            }
        };

        Ok(Self {
            id,
            company_directory_id,
            metadata,
            created_at,
        })
    }

    /// Returns the record identifier.
    #[must_use]
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Returns the owning company directory.
    #[must_use]
    pub fn company_directory_id(&self) -> CompanyDirectoryId {
        self.company_directory_id
    }

    /// Returns free-form record metadata.
    #[must_use]
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// One typed attribute of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryValue {
    id: ValueId,
    record_id: RecordId,
    field_id: FieldId,
    value: FieldValue,
}

impl DirectoryValue {
    /// Creates a value bound to `field`, casting `raw` to the field's declared type.
    pub fn for_field(
        id: ValueId,
        record_id: RecordId,
        field: &DirectoryField,
        raw: &Value,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            record_id,
            field_id: field.id(),
            value: FieldValue::cast(field.field_type(), raw)?,
        })
    }

    /// Restores a persisted value using the field's declared type.
    pub fn from_storage(
        id: ValueId,
        record_id: RecordId,
        field: &DirectoryField,
        text: &str,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            record_id,
            field_id: field.id(),
            value: FieldValue::from_storage(field.field_type(), text)?,
        })
    }

    /// Returns the value identifier.
    #[must_use]
    pub fn id(&self) -> ValueId {
        self.id
    }

    /// Returns the owning record.
    #[must_use]
    pub fn record_id(&self) -> RecordId {
        self.record_id
    }

    /// Returns the field the value is bound to.
    #[must_use]
    pub fn field_id(&self) -> FieldId {
        self.field_id
    }

    /// Returns the typed value.
    #[must_use]
    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    /// Returns the canonical persisted text.
    #[must_use]
    pub fn storage_text(&self) -> String {
        self.value.to_storage_text()
    }
}
