// wap-core/src/domain/wap/audit.rs

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::ports::lakehouse::ScanResult;

/// Verdict of the audit step, journaled as the step output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub table: String,
    pub column: String,
    pub rows_scanned: u64,
    pub null_count: u64,
    pub passed: bool,
}

/// The one quality rule of the flow: the audited column holds no NULL.
pub struct NullCheck<'a> {
    table: &'a str,
    column: &'a str,
}

impl<'a> NullCheck<'a> {
    pub fn new(table: &'a str, column: &'a str) -> Self {
        Self { table, column }
    }

    pub fn evaluate(&self, scan: &ScanResult) -> Result<AuditReport, DomainError> {
        let values = scan
            .column(self.column)
            .ok_or_else(|| DomainError::ColumnNotFound {
                table: self.table.to_string(),
                column: self.column.to_string(),
            })?;

        let null_count = values.filter(|v| v.is_null()).count() as u64;

        Ok(AuditReport {
            table: self.table.to_string(),
            column: self.column.to_string(),
            rows_scanned: scan.num_rows() as u64,
            null_count,
            passed: null_count == 0,
        })
    }
}
