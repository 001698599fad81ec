// wap-core/src/domain/workflow/mod.rs

pub mod retry;
pub mod run;
pub mod schedule;

pub use retry::RetryConfig;
pub use run::{StepRecord, StepStatus, WAP_WORKFLOW_NAME, WorkflowRun, WorkflowStatus};
pub use schedule::{CronSchedule, DEFAULT_SCHEDULE};
