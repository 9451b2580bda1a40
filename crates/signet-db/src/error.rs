//! Error types for the signet-db crate.
//!
//! Provides a unified error type that wraps `SQLx` errors with additional context.

use thiserror::Error;

/// Database operation errors.
///
/// Uniqueness violations get their own variant because the reconciliation
/// engine treats them as "record now exists" rather than as a fault.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to establish or acquire a database connection.
    #[error("database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// A database migration failed to apply.
    #[error("migration failed: {0}")]
    MigrationFailed(#[from] sqlx::migrate::MigrateError),

    /// An insert hit one of the store's uniqueness invariants.
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation {
        /// Name of the violated constraint, when the driver reports one.
        constraint: String,
    },

    /// A lookup that must succeed returned no row.
    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    /// Any other query failure.
    #[error("query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),
}

impl DbError {
    /// Whether this error is a uniqueness violation on create.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation) {
                return DbError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or("<unnamed>").to_string(),
                };
            }
        }
        DbError::QueryFailed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_is_detected() {
        let err = DbError::UniqueViolation {
            constraint: "user_accounts_provider_external_id_key".to_string(),
        };
        assert!(err.is_unique_violation());
        assert!(!DbError::NotFound { resource: "User" }.is_unique_violation());
    }

    #[test]
    fn test_display_includes_constraint() {
        let err = DbError::UniqueViolation {
            constraint: "user_emails_address_key".to_string(),
        };
        assert!(err.to_string().contains("user_emails_address_key"));
    }

    #[test]
    fn test_row_not_found_maps_to_query_failed() {
        let err = DbError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::QueryFailed(_)));
    }
}
