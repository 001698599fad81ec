// wap-core/src/ports/lakehouse.rs

// This file defines what the WAP flow needs from a lakehouse, without knowing how it's done.
// The branch/namespace/table catalog lives on the other side: we only pass names around.

use crate::error::WapError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

static NULL: serde_json::Value = serde_json::Value::Null;

/// A table addressed inside a namespace (independent of any backend).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub namespace: String,
    pub name: String,
}

impl TableRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// `namespace.table`
    pub fn fq_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

/// Result of a columnar scan: one entry per requested column, rows in scan order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl ScanResult {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Values of a single column, `None` if the scan did not return it.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &serde_json::Value>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .map(move |row| row.get(idx).unwrap_or(&NULL)),
        )
    }
}

/// What the lakehouse answers once a branch has been merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeReceipt {
    pub source_ref: String,
    pub into_branch: String,
    #[serde(default)]
    pub commit: Option<String>,
}

#[async_trait]
pub trait Lakehouse: Send + Sync {
    // --- Branches ---
    async fn has_branch(&self, branch: &str) -> Result<bool, WapError>;

    async fn create_branch(&self, branch: &str, from_ref: &str) -> Result<(), WapError>;

    /// Returns `false` when there was nothing to delete.
    async fn delete_branch(&self, branch: &str) -> Result<bool, WapError>;

    async fn merge_branch(
        &self,
        source_ref: &str,
        into_branch: &str,
    ) -> Result<MergeReceipt, WapError>;

    // --- Namespaces ---
    async fn has_namespace(&self, namespace: &str, reference: &str) -> Result<bool, WapError>;

    async fn create_namespace(&self, namespace: &str, branch: &str) -> Result<(), WapError>;

    // --- Tables ---
    async fn create_table(
        &self,
        table: &TableRef,
        search_uri: &str,
        branch: &str,
        replace: bool,
    ) -> Result<(), WapError>;

    async fn has_table(&self, table: &TableRef, reference: &str) -> Result<bool, WapError>;

    async fn import_data(
        &self,
        table: &TableRef,
        search_uri: &str,
        branch: &str,
    ) -> Result<bool, WapError>;

    async fn scan(
        &self,
        table: &TableRef,
        reference: &str,
        columns: &[String],
    ) -> Result<ScanResult, WapError>;

    fn backend_name(&self) -> &str;
}
