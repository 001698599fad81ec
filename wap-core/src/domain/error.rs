// wap-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Branch '{0}' not found")]
    #[diagnostic(
        code(wap::domain::branch_not_found),
        help("The branch should exist right after its creation. Check the lakehouse logs.")
    )]
    BranchNotFound(String),

    #[error("Table '{0}' not found")]
    #[diagnostic(code(wap::domain::table_not_found))]
    TableNotFound(String),

    #[error("Column '{column}' not returned by the scan of '{table}'")]
    #[diagnostic(
        code(wap::domain::column_not_found),
        help("Make sure the audited column exists in the dataset (AUDIT_COLUMN).")
    )]
    ColumnNotFound { table: String, column: String },

    #[error("Branch '{0}' is protected and cannot be used as an ingestion branch")]
    #[diagnostic(
        code(wap::domain::protected_branch),
        help("Pick an ephemeral branch name (BRANCH_NAME) different from the main branch.")
    )]
    ProtectedBranch(String),

    #[error("Import into '{0}' reported no data")]
    #[diagnostic(code(wap::domain::import_failed))]
    ImportFailed(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(wap::domain::config))]
    InvalidConfig(String),

    #[error("Invalid schedule '{expression}': {reason}")]
    #[diagnostic(
        code(wap::domain::schedule),
        help("Use a cron expression such as '*/1 * * * *'.")
    )]
    InvalidSchedule { expression: String, reason: String },

    #[error("Workflow '{workflow_id}' diverged at step {seq}: expected '{expected}', found '{found}'")]
    #[diagnostic(
        code(wap::domain::replay),
        help("A resumed workflow must call its steps in the same order as the original run.")
    )]
    NonDeterministicReplay {
        workflow_id: String,
        seq: u32,
        expected: String,
        found: String,
    },

    #[error("Workflow '{workflow_id}' already failed: {reason}")]
    #[diagnostic(code(wap::domain::workflow_failed))]
    WorkflowFailed { workflow_id: String, reason: String },
}
