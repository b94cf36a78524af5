//! Shared primitives for all Rust crates in Tessera.

#![forbid(unsafe_code)]

/// Authentication primitives shared across services.
pub mod auth;
/// Typed identifiers for persisted resources.
pub mod ids;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::UserIdentity;
pub use ids::{
    CompanyDirectoryId, CompanyId, CompanyModuleId, DirectoryId, FieldId, ModuleId, PermissionId,
    RecordId, RoleId, UserId, ValueId,
};

/// Result type used across Tessera crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
///
/// Every variant is recoverable; callers map them to transport responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Schema or field definition violates an invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// A record payload names a field the directory does not define.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A raw value cannot be cast to the declared field type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// The role already holds a live grant for the permission.
    #[error("duplicate grant: {0}")]
    DuplicateGrant(String),

    /// Cascading trigger configuration would form a cycle.
    #[error("cyclic dependency: {0}")]
    CyclicDependency(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller identity is missing or malformed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authorization evaluator denied the action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Opaque failure raised by the persistent store.
    #[error("store error: {0}")]
    Store(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
