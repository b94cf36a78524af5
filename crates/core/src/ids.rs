use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppError;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID value.
            #[must_use]
            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Returns the underlying UUID value.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim()).map(Self).map_err(|error| {
                    AppError::Validation(format!(
                        concat!("invalid ", $label, " '{}': {}"),
                        value, error
                    ))
                })
            }
        }
    };
}

uuid_identifier!(
    /// Company (tenant) identifier.
    CompanyId,
    "company id"
);
uuid_identifier!(
    /// Module identifier.
    ModuleId,
    "module id"
);
uuid_identifier!(
    /// Identifier of a module enabled for one company.
    CompanyModuleId,
    "company module id"
);
uuid_identifier!(
    /// Directory (user-defined record type) identifier.
    DirectoryId,
    "directory id"
);
uuid_identifier!(
    /// Directory field identifier.
    FieldId,
    "field id"
);
uuid_identifier!(
    /// Identifier of a directory enabled for one company.
    CompanyDirectoryId,
    "company directory id"
);
uuid_identifier!(
    /// Directory record identifier.
    RecordId,
    "record id"
);
uuid_identifier!(
    /// Directory value identifier.
    ValueId,
    "value id"
);
uuid_identifier!(
    /// Permission identifier.
    PermissionId,
    "permission id"
);
uuid_identifier!(
    /// Role identifier.
    RoleId,
    "role id"
);
uuid_identifier!(
    /// User identifier supplied by the authentication layer.
    UserId,
    "user id"
);

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{DirectoryId, RecordId};

    #[test]
    fn identifier_formats_as_uuid() {
        let directory_id = DirectoryId::new();
        assert_eq!(directory_id.to_string().len(), 36);
    }

    #[test]
    fn identifier_parses_its_own_display_value() {
        let record_id = RecordId::new();
        let parsed = RecordId::from_str(record_id.to_string().as_str());
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap_or_default(), record_id);
    }

    #[test]
    fn malformed_identifier_is_rejected() {
        let parsed = RecordId::from_str("not-a-uuid");
        assert!(parsed.is_err());
    }
}
