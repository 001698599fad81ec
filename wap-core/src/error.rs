// wap-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WapError {
    // --- ERREURS DU DOMAINE (Assertions, Audit, Replay) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- ERREURS D'INFRASTRUCTURE (HTTP, DuckDB, IO, Parsing) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- ERREURS GÉNÉRIQUES / APPLICATIVES ---
    #[error("Internal Error: {0}")]
    InternalError(String),
}

// Manual implementations to avoid duplicate enum variants but keep ergonomics
impl From<std::io::Error> for WapError {
    fn from(err: std::io::Error) -> Self {
        WapError::Infrastructure(InfrastructureError::Io(err))
    }
}

impl From<duckdb::Error> for WapError {
    fn from(err: duckdb::Error) -> Self {
        WapError::Infrastructure(InfrastructureError::Database(DatabaseError::DuckDB(err)))
    }
}

impl From<serde_json::Error> for WapError {
    fn from(err: serde_json::Error) -> Self {
        WapError::Infrastructure(InfrastructureError::Json(err))
    }
}

/// Decides whether a failed step deserves another attempt.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for WapError {
    fn is_retryable(&self) -> bool {
        match self {
            WapError::Infrastructure(InfrastructureError::Http(e)) => {
                e.is_timeout() || e.is_connect() || e.is_request()
            }
            WapError::Infrastructure(InfrastructureError::Api { status, .. }) => {
                *status == 429 || *status >= 500
            }
            // Assertions, config, parsing: retrying won't change the answer
            _ => false,
        }
    }
}
