// wap-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(wap::infra::database::duckdb),
        help("An error occurred inside the local lakehouse engine.")
    )]
    DuckDB(#[from] duckdb::Error),
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE (Local backend) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- HTTP (Remote lakehouse) ---
    #[error("HTTP Transport Error: {0}")]
    #[diagnostic(
        code(wap::infra::http),
        help("Check the lakehouse URL and your network connectivity.")
    )]
    Http(#[from] reqwest::Error),

    #[error("Lakehouse API returned {status}: {message}")]
    #[diagnostic(code(wap::infra::api))]
    Api { status: u16, message: String },

    #[error("Lakehouse rejected the operation: {0}")]
    #[diagnostic(code(wap::infra::rejected))]
    Rejected(String),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(wap::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(wap::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON Error: {0}")]
    #[diagnostic(code(wap::infra::json))]
    Json(#[from] serde_json::Error),

    // --- JOURNAL ---
    #[error("Invalid workflow id '{0}'")]
    #[diagnostic(
        code(wap::infra::journal::workflow_id),
        help("Workflow ids use letters, digits, '.', '_' and '-', and cannot start with '.'.")
    )]
    InvalidWorkflowId(String),

    #[error("Journal record for '{requested}' holds workflow '{found}'")]
    #[diagnostic(code(wap::infra::journal::mismatch))]
    JournalMismatch { requested: String, found: String },

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Settings file not found at '{0}'")]
    #[diagnostic(code(wap::infra::config_missing))]
    ConfigNotFound(String),
}

// Manual implementation for shortcuts (e.g. `?` operator on duckdb calls)
impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}
