//! Core Dispatch error types

use thiserror::Error;

/// Core Dispatch error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error (pool, schema, query)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Write rejected by a uniqueness constraint
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Write rejected by a foreign key constraint
    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// SQLite extended result codes for constraint failures
const SQLITE_CONSTRAINT_CHECK: i32 = 275;
const SQLITE_CONSTRAINT_FOREIGNKEY: i32 = 787;
const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, msg)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                let detail = msg.clone().unwrap_or_else(|| err.to_string());
                match code.extended_code {
                    SQLITE_CONSTRAINT_UNIQUE | SQLITE_CONSTRAINT_PRIMARYKEY => {
                        Error::UniqueViolation(detail)
                    }
                    SQLITE_CONSTRAINT_FOREIGNKEY => Error::ForeignKeyViolation(detail),
                    SQLITE_CONSTRAINT_CHECK => Error::Storage(format!("check failed: {}", detail)),
                    _ => Error::Storage(detail),
                }
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound(err.to_string()),
            _ => Error::Storage(err.to_string()),
        }
    }
}

impl From<r2d2::Error> for Error {
    fn from(err: r2d2::Error) -> Self {
        Error::Storage(format!("connection pool: {}", err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type alias for Core Dispatch operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint_failure(extended_code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(extended_code),
            Some("constraint failed".to_string()),
        )
    }

    #[test]
    fn test_unique_violation_classified() {
        let err: Error = constraint_failure(SQLITE_CONSTRAINT_UNIQUE).into();
        assert!(matches!(err, Error::UniqueViolation(_)));
    }

    #[test]
    fn test_foreign_key_violation_classified() {
        let err: Error = constraint_failure(SQLITE_CONSTRAINT_FOREIGNKEY).into();
        assert!(matches!(err, Error::ForeignKeyViolation(_)));
    }

    #[test]
    fn test_other_constraint_is_storage_error() {
        let err: Error = constraint_failure(SQLITE_CONSTRAINT_CHECK).into();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_no_rows_is_not_found() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_error_display() {
        let err = Error::Config("DATABASE_URL is required".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: DATABASE_URL is required"
        );
    }
}
