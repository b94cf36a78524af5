use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tessera_core::{AppError, AppResult, DirectoryId, NonEmptyString};

/// Ownership class of a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryType {
    /// Directory shipped with a module.
    Module,
    /// Directory defined by a company administrator.
    Company,
    /// Protected platform directory.
    System,
}

impl DirectoryType {
    /// Returns a stable storage value for the directory type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Company => "company",
            Self::System => "system",
        }
    }
}

impl FromStr for DirectoryType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "module" => Ok(Self::Module),
            "company" => Ok(Self::Company),
            "system" => Ok(Self::System),
            _ => Err(AppError::Validation(format!(
                "unknown directory type '{value}'"
            ))),
        }
    }
}

/// User-definable record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directory {
    id: DirectoryId,
    name: NonEmptyString,
    icon: Option<String>,
    directory_type: DirectoryType,
    metadata: Value,
}

impl Directory {
    /// Creates a validated directory definition.
    ///
    /// A `null` metadata payload is normalized to an empty object.
    pub fn new(
        id: DirectoryId,
        name: impl Into<String>,
        icon: Option<String>,
        directory_type: DirectoryType,
        metadata: Value,
    ) -> AppResult<Self> {
        let metadata = match metadata {
            Value::Null => Value::Object(Map::new()),
            Value::Object(_) => metadata,
            _ => {
                return Err(AppError::Validation(
                    "directory metadata must be a JSON object".to_owned(),
                ));
            }
        };

        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            icon: icon.filter(|value| !value.trim().is_empty()),
            directory_type,
            metadata,
        })
    }

    /// Returns the directory identifier.
    #[must_use]
    pub fn id(&self) -> DirectoryId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the optional icon key.
    #[must_use]
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    /// Returns the ownership class.
    #[must_use]
    pub fn directory_type(&self) -> DirectoryType {
        self.directory_type
    }

    /// Returns the free-form metadata object.
    #[must_use]
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    /// Returns whether the directory is protected from deletion.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.directory_type == DirectoryType::System
    }
}
