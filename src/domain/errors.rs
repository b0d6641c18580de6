//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! The HTTP layer maps each variant onto a status code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Referenced donation, version or content item does not exist
    #[error("{0}")]
    NotFound(String),
    /// Malformed or incomplete input
    #[error("Validation error: {0}")]
    Validation(String),
    /// The request is well-formed but the current state forbids it
    #[error("{0}")]
    Precondition(String),
    /// A concurrent writer changed the record between read and write
    #[error("{0}")]
    Conflict(String),
    /// Payment gateway missing, unreachable or misbehaving
    #[error("{0}")]
    Upstream(String),
    /// Database/persistence error
    #[error("Database error: {0}")]
    Database(String),
    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(what: &str) -> Self {
        DomainError::NotFound(format!("{} not found", what))
    }

    /// True for failures an operator has to look at (surfaced as 5xx).
    pub fn is_server_side(&self) -> bool {
        matches!(
            self,
            DomainError::Upstream(_) | DomainError::Database(_) | DomainError::Internal(_)
        )
    }
}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Internal(format!("JSON error: {}", e))
    }
}
