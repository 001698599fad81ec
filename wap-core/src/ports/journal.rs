// wap-core/src/ports/journal.rs

use crate::domain::workflow::WorkflowRun;
use crate::error::WapError;

/// Durable storage for workflow runs and their step records.
///
/// Synchronous on purpose: implementations write small documents, and the
/// executor saves after every step.
pub trait WorkflowJournal: Send + Sync {
    fn load(&self, workflow_id: &str) -> Result<Option<WorkflowRun>, WapError>;

    fn save(&self, run: &WorkflowRun) -> Result<(), WapError>;

    /// All known runs, most recent first.
    fn list(&self) -> Result<Vec<WorkflowRun>, WapError>;
}
