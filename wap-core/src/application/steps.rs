// wap-core/src/application/steps.rs
//
// The five WAP steps. Each one is a thin sequence of lakehouse calls plus the
// assertions that make the next step safe to run.

use tracing::{info, instrument};

use crate::domain::error::DomainError;
use crate::domain::wap::{AuditReport, NullCheck, WapConfig};
use crate::error::WapError;
use crate::ports::lakehouse::{Lakehouse, MergeReceipt};

/// Idempotent reset: drop a leftover branch, fork a fresh one from main.
/// Returns whether a stale branch had to be deleted first.
#[instrument(skip(lakehouse, config), fields(branch = %config.branch_name))]
pub async fn reset_branch(lakehouse: &dyn Lakehouse, config: &WapConfig) -> Result<bool, WapError> {
    let branch = &config.branch_name;

    // if the branch already exists, we delete it and create a new one
    let stale = lakehouse.has_branch(branch).await?;
    if stale {
        info!("Branch already exists, deleting it first");
        lakehouse.delete_branch(branch).await?;
    }

    lakehouse.create_branch(branch, &config.main_branch).await?;

    if !lakehouse.has_branch(branch).await? {
        return Err(DomainError::BranchNotFound(branch.clone()).into());
    }
    info!(from_ref = %config.main_branch, "Branch ready");
    Ok(stale)
}

/// Namespace (if missing) → table definition → import, all on the branch.
#[instrument(skip(lakehouse, config), fields(branch = %config.branch_name, table = %config.table().fq_name()))]
pub async fn ingest(lakehouse: &dyn Lakehouse, config: &WapConfig) -> Result<bool, WapError> {
    let branch = &config.branch_name;
    let table = config.table();

    if !lakehouse.has_namespace(&config.namespace, branch).await? {
        info!(namespace = %config.namespace, "Creating namespace");
        lakehouse.create_namespace(&config.namespace, branch).await?;
    }

    // replace: the table may be there from a previous run
    lakehouse
        .create_table(&table, &config.source_uri, branch, true)
        .await?;

    if !lakehouse.has_table(&table, branch).await? {
        return Err(DomainError::TableNotFound(table.fq_name()).into());
    }

    let imported = lakehouse
        .import_data(&table, &config.source_uri, branch)
        .await?;
    if !imported {
        return Err(DomainError::ImportFailed(table.fq_name()).into());
    }

    info!(source = %config.source_uri, "Data imported");
    Ok(imported)
}

/// Columnar scan of the audited column on the branch, then the null check.
#[instrument(skip(lakehouse, config), fields(branch = %config.branch_name, column = %config.audit_column))]
pub async fn run_quality_checks(
    lakehouse: &dyn Lakehouse,
    config: &WapConfig,
) -> Result<AuditReport, WapError> {
    let table = config.table();
    let fq_name = table.fq_name();

    info!("Perform a columnar scan on the column {}", config.audit_column);
    let scan = lakehouse
        .scan(
            &table,
            &config.branch_name,
            std::slice::from_ref(&config.audit_column),
        )
        .await?;
    info!(rows = scan.num_rows(), "Read the table successfully!");

    let report = NullCheck::new(&fq_name, &config.audit_column).evaluate(&scan)?;
    info!(
        nulls = report.null_count,
        passed = report.passed,
        "Null check evaluated"
    );
    Ok(report)
}

#[instrument(skip(lakehouse, config), fields(branch = %config.branch_name, into = %config.main_branch))]
pub async fn merge_branch(
    lakehouse: &dyn Lakehouse,
    config: &WapConfig,
) -> Result<MergeReceipt, WapError> {
    let receipt = lakehouse
        .merge_branch(&config.branch_name, &config.main_branch)
        .await?;
    info!(commit = ?receipt.commit, "Branch merged");
    Ok(receipt)
}

#[instrument(skip(lakehouse))]
pub async fn delete_branch(lakehouse: &dyn Lakehouse, branch: &str) -> Result<bool, WapError> {
    lakehouse.delete_branch(branch).await
}
