use tessera_application::{CascadingOptions, RecordView, ValueUpdate};

use crate::dto::CascadingDependentResponse;

use super::types::{CascadingOptionsResponse, RecordResponse, ValueUpdateResponse};

impl From<RecordView> for RecordResponse {
    fn from(value: RecordView) -> Self {
        Self {
            id: value.id,
            company_directory_id: value.company_directory_id,
            metadata: value.metadata,
            created_at: value.created_at,
            values: value
                .values
                .into_iter()
                .map(|(name, value)| (name, value.to_json()))
                .collect(),
        }
    }
}

impl From<ValueUpdate> for ValueUpdateResponse {
    fn from(value: ValueUpdate) -> Self {
        Self {
            value: value.value.to_json(),
            dependents: value
                .dependents
                .into_iter()
                .map(CascadingDependentResponse::from)
                .collect(),
        }
    }
}

impl From<CascadingOptions> for CascadingOptionsResponse {
    fn from(value: CascadingOptions) -> Self {
        Self {
            dependent: CascadingDependentResponse::from(value.dependent),
            records: value.records.into_iter().map(RecordResponse::from).collect(),
        }
    }
}
