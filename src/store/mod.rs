//! Provisioning store boundary
//!
//! The three discrete writes the board provisioning flow issues: insert a
//! board, batch-insert its categories, delete a board. Each call stands on
//! its own; there is no transaction spanning them.
//!
//! Failures come back as a structured [`StoreError`] carrying the driver's
//! machine-readable code so callers can tell a taken slug from a permission
//! problem without parsing messages.

mod sql;

use async_trait::async_trait;
use std::fmt;

use crate::models::{Board, Category, CategorySpec, NewBoard};

pub use sql::SqlxProvisioningStore;

/// Classification of a store failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    UniqueViolation,
    ForeignKeyViolation,
    PermissionDenied,
    Connection,
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UniqueViolation => write!(f, "unique_violation"),
            Self::ForeignKeyViolation => write!(f, "foreign_key_violation"),
            Self::PermissionDenied => write!(f, "permission_denied"),
            Self::Connection => write!(f, "connection"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Error returned by a provisioning store call
///
/// Displays as the store's own message, unmodified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    /// Driver error code (SQLSTATE or engine result code), empty if none
    pub code: String,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.kind == StoreErrorKind::UniqueViolation
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) => {
                let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
                let message = db.message().to_string();
                let kind = match db.kind() {
                    sqlx::error::ErrorKind::UniqueViolation => StoreErrorKind::UniqueViolation,
                    sqlx::error::ErrorKind::ForeignKeyViolation => {
                        StoreErrorKind::ForeignKeyViolation
                    }
                    _ if is_permission_error(&code, &message) => StoreErrorKind::PermissionDenied,
                    _ => StoreErrorKind::Other,
                };
                Self::new(kind, code, message)
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => {
                Self::new(StoreErrorKind::Connection, "", err.to_string())
            }
            _ => Self::new(StoreErrorKind::Other, "", err.to_string()),
        }
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(StoreErrorKind::Other, "", format!("{:#}", err))
    }
}

/// SQLite: SQLITE_PERM (3), SQLITE_READONLY (8), SQLITE_AUTH (23).
/// MySQL: SQLSTATE 28000 and 42000 "denied" errors.
fn is_permission_error(code: &str, message: &str) -> bool {
    match code {
        "3" | "8" | "23" | "28000" | "42501" => true,
        "42000" => message.to_lowercase().contains("denied"),
        _ => message.to_lowercase().contains("permission denied"),
    }
}

/// Writes used by the board provisioning flow
#[async_trait]
pub trait ProvisioningStore: Send + Sync {
    /// Insert one board and return the stored row, `None` if the store
    /// reported success without handing a row back
    async fn insert_board(&self, board: &NewBoard) -> Result<Option<Board>, StoreError>;

    /// Insert all categories of a board in one request
    async fn insert_categories(
        &self,
        board_id: i64,
        categories: &[CategorySpec],
    ) -> Result<Vec<Category>, StoreError>;

    /// Delete a board; its categories go with it
    async fn delete_board(&self, board_id: i64) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_displays_message_verbatim() {
        let err = StoreError::new(
            StoreErrorKind::PermissionDenied,
            "42501",
            "new row violates row-level security policy for table \"boards\"",
        );
        assert_eq!(
            err.to_string(),
            "new row violates row-level security policy for table \"boards\""
        );
    }

    #[test]
    fn test_is_permission_error() {
        assert!(is_permission_error("23", "not authorized"));
        assert!(is_permission_error("8", "attempt to write a readonly database"));
        assert!(is_permission_error(
            "42000",
            "INSERT command denied to user 'app'@'localhost' for table 'boards'"
        ));
        assert!(!is_permission_error("42000", "You have an error in your SQL syntax"));
        assert!(is_permission_error("", "permission denied for table boards"));
        assert!(!is_permission_error("2067", "UNIQUE constraint failed: boards.slug"));
    }

    #[test]
    fn test_pool_errors_are_connection_errors() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind, StoreErrorKind::Connection);
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_other_sqlx_errors() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.kind, StoreErrorKind::Other);
        assert!(err.code.is_empty());
    }

    #[test]
    fn test_anyhow_errors_keep_context_chain() {
        let err = StoreError::from(anyhow::anyhow!("column missing").context("Failed to map row"));
        assert_eq!(err.kind, StoreErrorKind::Other);
        assert_eq!(err.message, "Failed to map row: column missing");
    }
}
