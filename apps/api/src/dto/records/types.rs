use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_core::{CompanyDirectoryId, CompanyId, RecordId};

use crate::dto::CascadingDependentResponse;

/// Incoming payload for record creation.
#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
    #[serde(default)]
    pub metadata: Value,
}

/// API representation of a record with its typed values.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    pub id: RecordId,
    pub company_directory_id: CompanyDirectoryId,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub values: BTreeMap<String, Value>,
}

/// Incoming payload for one value replacement.
#[derive(Debug, Deserialize)]
pub struct UpdateValueRequest {
    pub value: Value,
}

/// Stored value and the dependents callers should refresh.
#[derive(Debug, Serialize)]
pub struct ValueUpdateResponse {
    pub value: Value,
    pub dependents: Vec<CascadingDependentResponse>,
}

/// Trigger value evaluated against one company's records.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadingOptionsRequest {
    pub company_id: CompanyId,
    pub value: Value,
}

/// Records of one dependent directory that satisfy its filter.
#[derive(Debug, Serialize)]
pub struct CascadingOptionsResponse {
    pub dependent: CascadingDependentResponse,
    pub records: Vec<RecordResponse>,
}
