// wap-core/src/domain/workflow/run.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::wap::{FlowOutcome, WapConfig};

pub const WAP_WORKFLOW_NAME: &str = "wap_flow";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Published,
    RolledBack,
    Failed,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkflowStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::Published => "published",
            WorkflowStatus::RolledBack => "rolled_back",
            WorkflowStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Failed,
}

/// One executed step. `output` holds the JSON-encoded return value so a
/// resumed run can hand it back without calling the lakehouse again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub seq: u32,
    pub name: String,
    pub status: StepStatus,
    pub attempts: u32,
    #[serde(default)]
    pub output: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub workflow_id: String,
    pub workflow_name: String,
    pub status: WorkflowStatus,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    pub config: WapConfig,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    #[serde(default)]
    pub outcome: Option<FlowOutcome>,
    #[serde(default)]
    pub error: Option<String>,
}

impl WorkflowRun {
    pub fn new(
        workflow_id: impl Into<String>,
        config: WapConfig,
        scheduled_for: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            workflow_name: WAP_WORKFLOW_NAME.to_string(),
            status: WorkflowStatus::Pending,
            scheduled_for,
            started_at: Utc::now(),
            finished_at: None,
            config,
            steps: Vec::new(),
            outcome: None,
            error: None,
        }
    }

    /// Last completed record for a sequence number, if any.
    pub fn completed_step(&self, seq: u32) -> Option<&StepRecord> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.seq == seq && s.status == StepStatus::Completed)
    }

    /// Replaces any previous record with the same sequence number.
    pub fn record_step(&mut self, record: StepRecord) {
        self.steps.retain(|s| s.seq != record.seq);
        self.steps.push(record);
        self.steps.sort_by_key(|s| s.seq);
    }

    pub fn complete(&mut self, outcome: FlowOutcome) {
        self.status = if outcome.is_published() {
            WorkflowStatus::Published
        } else {
            WorkflowStatus::RolledBack
        };
        self.outcome = Some(outcome);
        self.error = None;
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = WorkflowStatus::Failed;
        self.error = Some(reason.into());
        self.finished_at = Some(Utc::now());
    }
}
