//! Error types for the election data model.
use thiserror::Error;

/// Everything that can go wrong while reading or writing election records.
///
/// None of these are retried or swallowed inside the crate; they surface to
/// whoever handles the request.
#[derive(Debug, Error)]
pub enum Error {
    /// A write collided with one of the uniqueness constraints, e.g. a second
    /// vote by the same account in the same measure.
    #[error("Uniqueness violation: {0}")]
    UniquenessViolation(String),

    /// No row for the requested id, or a base row whose subtype row is
    /// missing or whose stored type is no longer known.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller broke a contract, such as saving a person candidate
    /// without a user.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Error::UniquenessViolation(db_err.message().to_string());
            }
        }
        Error::Database(err)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn driver_errors_keep_their_source() {
        let err = Error::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, Error::Database(_)));
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("Database error: "));
    }

    #[test]
    fn crate_errors_have_no_source() {
        assert!(Error::NotFound("measure #1".to_string()).source().is_none());
    }
}
