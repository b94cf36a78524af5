use tessera_application::{CascadingDependent, FilterBinding};
use tessera_domain::{Directory, DirectoryField};

use super::types::{
    CascadingDependentResponse, DirectoryResponse, FieldResponse, FilterBindingResponse,
};

impl From<Directory> for DirectoryResponse {
    fn from(value: Directory) -> Self {
        Self {
            id: value.id(),
            name: value.name().as_str().to_owned(),
            icon: value.icon().map(str::to_owned),
            directory_type: value.directory_type().as_str().to_owned(),
            metadata: value.metadata().clone(),
            is_protected: value.is_protected(),
        }
    }
}

impl From<DirectoryField> for FieldResponse {
    fn from(value: DirectoryField) -> Self {
        Self {
            id: value.id(),
            directory_id: value.directory_id(),
            name: value.name().as_str().to_owned(),
            field_type: value.field_type().as_str().to_owned(),
            relation_id: value.relation_id(),
            metadata: value.metadata().to_json(),
        }
    }
}

impl From<FilterBinding> for FilterBindingResponse {
    fn from(value: FilterBinding) -> Self {
        match value {
            FilterBinding::Value(value) => Self::Value {
                value: value.to_json(),
            },
            FilterBinding::Upstream {
                directory_id,
                field_id,
            } => Self::Upstream {
                directory_id,
                field_id,
            },
        }
    }
}

impl From<CascadingDependent> for CascadingDependentResponse {
    fn from(value: CascadingDependent) -> Self {
        Self {
            dependent_directory_id: value.dependent_directory_id,
            trigger_field_id: value.trigger_field_id,
            field_name: value.filter.field_name,
            binding: FilterBindingResponse::from(value.filter.binding),
            depth: value.depth,
        }
    }
}
