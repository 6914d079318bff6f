//! Ledger error taxonomy.
//!
//! Every operation surfaces one of these kinds; the HTTP layer maps
//! them to status codes. `Conflict` and `Forbidden` messages carry
//! enough detail (current status, owner context) for the caller to
//! explain the failure to a human without a second round-trip.

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Caller identity missing or invalid")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Store failure: {0}")]
    Internal(#[from] DatabaseError),
}

impl LedgerError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Stable machine-readable kind, used in logs and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Internal(DatabaseError::Sqlite(err))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
