// wap-core/src/domain/wap/outcome.rs

use serde::{Deserialize, Serialize};

use crate::domain::wap::audit::AuditReport;
use crate::ports::lakehouse::MergeReceipt;

/// How a WAP run ended when no step errored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FlowOutcome {
    /// Audit passed: the branch was merged into main, then deleted.
    Published {
        audit: AuditReport,
        merge: MergeReceipt,
    },
    /// Audit failed: the branch was deleted, main is untouched.
    RolledBack { audit: AuditReport },
}

impl FlowOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, FlowOutcome::Published { .. })
    }

    pub fn audit(&self) -> &AuditReport {
        match self {
            FlowOutcome::Published { audit, .. } | FlowOutcome::RolledBack { audit } => audit,
        }
    }
}
