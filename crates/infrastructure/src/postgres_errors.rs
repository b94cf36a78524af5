use tessera_core::AppError;
use tracing::warn;

/// Maps a driver failure to an opaque store error, logging the cause.
pub(crate) fn store_error(context: &str, error: sqlx::Error) -> AppError {
    warn!(%error, context, "postgres operation failed");
    AppError::Store(format!("{context}: {error}"))
}

/// Returns whether the failure is a unique constraint violation.
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(database_error) = error
        && database_error.code().as_deref() == Some("23505")
    {
        return true;
    }

    false
}

/// Returns whether the failure is a foreign key violation.
pub(crate) fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(database_error) = error
        && database_error.code().as_deref() == Some("23503")
    {
        return true;
    }

    false
}
