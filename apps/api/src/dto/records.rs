mod conversions;
mod types;

pub use types::{
    CascadingOptionsRequest, CascadingOptionsResponse, CreateRecordRequest, RecordResponse,
    UpdateValueRequest, ValueUpdateResponse,
};
