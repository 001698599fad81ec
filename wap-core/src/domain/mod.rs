pub mod error;
pub mod wap;
pub mod workflow;

// Re-exports pratiques pour simplifier les imports ailleurs
pub use error::DomainError;
pub use wap::{AuditReport, FlowOutcome, WapConfig};
pub use workflow::{CronSchedule, RetryConfig, StepRecord, StepStatus, WorkflowRun, WorkflowStatus};
