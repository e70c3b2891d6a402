//! Store error type.

use std::path::PathBuf;
use thiserror::Error;

use super::live::Table;

/// Errors surfaced by the store and its access objects.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique, foreign-key, not-null or check constraint rejected a write.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// An update addressed a primary key with no row behind it.
    #[error("No {table} row with key {key}")]
    NotFound { table: Table, key: i64 },

    /// A row without a primary key was passed where a stored row is required.
    #[error("{0} row has not been stored yet")]
    Unsaved(Table),

    /// A stored value could not be mapped back into its model.
    #[error("Invalid stored value: {0}")]
    Corrupt(String),

    #[error("Failed to prepare database directory '{}': {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    pub fn is_constraint(&self) -> bool {
        matches!(self, StoreError::Constraint(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            use sqlx::error::ErrorKind;
            match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    return StoreError::Constraint(db_err.message().to_string());
                }
                _ => {}
            }
        }
        StoreError::Database(e)
    }
}
