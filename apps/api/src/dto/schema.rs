mod conversions;
mod types;

pub use types::{
    CascadingDependentResponse, CreateDirectoryRequest, DefineFieldRequest, DirectoryResponse,
    FieldResponse, ResolveDependentsRequest, UpdateFieldMetadataRequest,
};
