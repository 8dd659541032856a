//! The module contains the error the engine can throw.
//!
//! Business-rule violations are ordinary, recoverable errors:
//!
//! - [`KeyNotFound`] thrown when a debt or a change request does not exist.
//! - [`Forbidden`] thrown when the caller is not a party of the debt (or not
//!   the requester, for cancellation).
//! - [`InvalidRequest`] thrown when a `modify` proposal is malformed.
//! - [`Conflict`] thrown when the debt already has a pending request.
//! - [`AlreadyResolved`] thrown when acting on a request that is no longer
//!   pending.
//!
//! [`Commit`] is the only one that signals a broken unit of work.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`InvalidRequest`]: EngineError::InvalidRequest
//!  [`Conflict`]: EngineError::Conflict
//!  [`AlreadyResolved`]: EngineError::AlreadyResolved
//!  [`Commit`]: EngineError::Commit
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Already resolved: {0}")]
    AlreadyResolved(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("commit failed: {0}")]
    Commit(DbErr),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::InvalidRequest(a), Self::InvalidRequest(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::AlreadyResolved(a), Self::AlreadyResolved(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::Commit(a), Self::Commit(b)) => a.to_string() == b.to_string(),
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
