use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tessera_core::{AppError, AppResult, DirectoryId, FieldId, NonEmptyString};

/// Supported directory field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Free text.
    Text,
    /// Opaque file path or URL.
    File,
    /// Boolean flag.
    Bool,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// UTC timestamp.
    Datetime,
    /// Arbitrary JSON structure.
    Json,
    /// Reference to a record of another directory.
    Relation,
    /// Floating-point decimal.
    Decimal,
    /// Signed 64-bit integer.
    Integer,
    /// Floating-point number.
    Number,
    /// Short single-line string.
    String,
    /// Email address.
    Email,
    /// Telephone number.
    Tel,
    /// Option picked from a list.
    Select,
    /// Multi-line text.
    Textarea,
}

impl FieldType {
    /// Returns a stable storage value for the field type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::File => "file",
            Self::Bool => "bool",
            Self::Date => "date",
            Self::Time => "time",
            Self::Datetime => "datetime",
            Self::Json => "json",
            Self::Relation => "relation",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Email => "email",
            Self::Tel => "tel",
            Self::Select => "select",
            Self::Textarea => "textarea",
        }
    }
}

impl FromStr for FieldType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(Self::Text),
            "file" => Ok(Self::File),
            "bool" => Ok(Self::Bool),
            "date" => Ok(Self::Date),
            "time" => Ok(Self::Time),
            "datetime" => Ok(Self::Datetime),
            "json" => Ok(Self::Json),
            "relation" => Ok(Self::Relation),
            "decimal" => Ok(Self::Decimal),
            "integer" => Ok(Self::Integer),
            "number" => Ok(Self::Number),
            "string" => Ok(Self::String),
            "email" => Ok(Self::Email),
            "tel" => Ok(Self::Tel),
            "select" => Ok(Self::Select),
            "textarea" => Ok(Self::Textarea),
            _ => Err(AppError::Validation(format!(
                "unknown field type '{value}'"
            ))),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Presentation and behavior hints attached to a field.
///
/// Unknown keys are preserved in `extra` so client-specific hints survive a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    /// Field is shown as a table column.
    #[serde(default = "default_true")]
    pub visible_on_table: bool,
    /// Ascending display position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_order: Option<i32>,
    /// Field may be edited after record creation.
    #[serde(default = "default_true")]
    pub is_editable: bool,
    /// Field may be used in record filters.
    #[serde(default)]
    pub is_filterable: bool,
    /// Selecting a value narrows `cascading_directory_id`.
    #[serde(default)]
    pub is_cascading_trigger: bool,
    /// Directory narrowed by this trigger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cascading_directory_id: Option<DirectoryId>,
    /// Attribute of the target directory compared against the trigger value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cascading_target_field: Option<String>,
    /// Any other client-defined hints.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for FieldMetadata {
    fn default() -> Self {
        Self {
            visible_on_table: true,
            field_order: None,
            is_editable: true,
            is_filterable: false,
            is_cascading_trigger: false,
            cascading_directory_id: None,
            cascading_target_field: None,
            extra: Map::new(),
        }
    }
}

impl FieldMetadata {
    /// Parses metadata from a JSON payload; `null` yields defaults.
    pub fn from_json(value: Value) -> AppResult<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }

        if !value.is_object() {
            return Err(AppError::Validation(
                "field metadata must be a JSON object".to_owned(),
            ));
        }

        serde_json::from_value(value)
            .map_err(|error| AppError::Validation(format!("invalid field metadata: {error}")))
    }

    /// Serializes metadata back into its JSON object form.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Returns the cascading target when the trigger is enabled.
    #[must_use]
    pub fn cascading_target(&self) -> Option<DirectoryId> {
        if self.is_cascading_trigger {
            self.cascading_directory_id
        } else {
            None
        }
    }

    fn validate(&self) -> AppResult<()> {
        if self.is_cascading_trigger && self.cascading_directory_id.is_none() {
            return Err(AppError::Validation(
                "cascading triggers require cascadingDirectoryId".to_owned(),
            ));
        }

        if let Some(target_field) = &self.cascading_target_field
            && target_field.trim().is_empty()
        {
            return Err(AppError::Validation(
                "cascadingTargetField must not be empty".to_owned(),
            ));
        }

        Ok(())
    }
}

/// Typed field definition owned by a directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryField {
    id: FieldId,
    directory_id: DirectoryId,
    name: NonEmptyString,
    field_type: FieldType,
    relation_id: Option<DirectoryId>,
    metadata: FieldMetadata,
}

impl DirectoryField {
    /// Creates a validated field definition.
    ///
    /// Existence of the relation target is checked by the schema service, not here.
    pub fn new(
        id: FieldId,
        directory_id: DirectoryId,
        name: impl Into<String>,
        field_type: FieldType,
        relation_id: Option<DirectoryId>,
        metadata: FieldMetadata,
    ) -> AppResult<Self> {
        match (field_type, relation_id.is_some()) {
            (FieldType::Relation, false) => {
                return Err(AppError::Validation(
                    "relation fields require relation_id".to_owned(),
                ));
            }
            (FieldType::Relation, true) => {}
            (_, true) => {
                return Err(AppError::Validation(
                    "relation_id is only allowed for relation fields".to_owned(),
                ));
            }
            (_, false) => {}
        }

        metadata.validate()?;

        Ok(Self {
            id,
            directory_id,
            name: NonEmptyString::new(name)?,
            field_type,
            relation_id,
            metadata,
        })
    }

    /// Returns a copy of the field carrying replaced metadata.
    pub fn with_metadata(&self, metadata: FieldMetadata) -> AppResult<Self> {
        metadata.validate()?;

        Ok(Self {
            metadata,
            ..self.clone()
        })
    }

    /// Returns the field identifier.
    #[must_use]
    pub fn id(&self) -> FieldId {
        self.id
    }

    /// Returns the owning directory.
    #[must_use]
    pub fn directory_id(&self) -> DirectoryId {
        self.directory_id
    }

    /// Returns the field name, unique within its directory.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the declared value type.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Returns the related directory for relation fields.
    #[must_use]
    pub fn relation_id(&self) -> Option<DirectoryId> {
        self.relation_id
    }

    /// Returns presentation and behavior metadata.
    #[must_use]
    pub fn metadata(&self) -> &FieldMetadata {
        &self.metadata
    }

    /// Returns the directory narrowed by this field, when it is a cascading trigger.
    #[must_use]
    pub fn cascading_target(&self) -> Option<DirectoryId> {
        self.metadata.cascading_target()
    }

    /// Returns the target attribute name compared against this trigger's value.
    #[must_use]
    pub fn cascading_target_field(&self) -> &str {
        self.metadata
            .cascading_target_field
            .as_deref()
            .unwrap_or(self.name.as_str())
    }
}

/// Sorts fields by `fieldOrder` ascending; unordered fields go last.
///
/// The sort is stable, so callers passing fields in creation order keep that order on ties.
pub fn order_fields(fields: &mut [DirectoryField]) {
    fields.sort_by_key(|field| match field.metadata.field_order {
        Some(order) => (0, order),
        None => (1, 0),
    });
}
