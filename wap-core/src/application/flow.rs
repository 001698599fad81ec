// wap-core/src/application/flow.rs
//
// The WAP workflow: Write on an ephemeral branch, Audit it, Publish to main
// only if the audit passed. Every step goes through the durable executor.

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use crate::application::durable::DurableContext;
use crate::application::steps;
use crate::domain::error::DomainError;
use crate::domain::wap::{FlowOutcome, WapConfig};
use crate::domain::workflow::{RetryConfig, WorkflowRun, WorkflowStatus};
use crate::error::WapError;
use crate::ports::journal::WorkflowJournal;
use crate::ports::lakehouse::Lakehouse;

/// Knobs shared by every run, coming from the settings file.
#[derive(Debug, Clone)]
pub struct FlowOptions {
    pub retry: RetryConfig,
    pub cleanup_on_error: bool,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            cleanup_on_error: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlowRequest {
    pub workflow_id: String,
    pub config: WapConfig,
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl FlowRequest {
    /// One-off run with a fresh id.
    pub fn adhoc(config: WapConfig) -> Self {
        Self {
            workflow_id: format!("wap-{}", uuid::Uuid::new_v4()),
            config,
            scheduled_for: None,
        }
    }
}

#[instrument(skip_all, fields(workflow_id = %request.workflow_id))]
pub async fn run_wap_flow(
    lakehouse: &dyn Lakehouse,
    journal: &dyn WorkflowJournal,
    request: FlowRequest,
    options: &FlowOptions,
) -> Result<FlowOutcome, WapError> {
    request.config.ensure_valid()?;

    // 1. Look up the journal: a known id is either finished or resumable
    let run = match journal.load(&request.workflow_id)? {
        Some(run) if run.status.is_terminal() => return recorded_result(run),
        Some(run) => {
            if run.config != request.config {
                warn!("Resuming with the inputs recorded at the first attempt");
            }
            info!(completed = run.steps.len(), "Resuming pending workflow");
            run
        }
        None => {
            let run = WorkflowRun::new(
                request.workflow_id.clone(),
                request.config.clone(),
                request.scheduled_for,
            );
            journal.save(&run)?;
            run
        }
    };

    let config = run.config.clone();

    info!(
        "Starting the WAP flow with the following parameters: {}, {}",
        config.table_name, config.branch_name
    );
    if let Some(scheduled) = run.scheduled_for {
        info!(
            "We scheduled the flow for {} and run it at {}",
            scheduled,
            Utc::now()
        );
    }

    // 2. Steps (Write -> Audit -> Publish)
    let mut ctx = DurableContext::new(journal, run, options.retry.clone());
    match execute_steps(&mut ctx, lakehouse, &config).await {
        Ok(outcome) => {
            ctx.complete(outcome.clone())?;
            Ok(outcome)
        }
        Err(e) => {
            error!(error = %e, "WAP flow failed");
            if options.cleanup_on_error {
                cleanup_after_failure(lakehouse, &config.branch_name).await;
            }
            ctx.fail(e.to_string())?;
            Err(e)
        }
    }
}

async fn execute_steps(
    ctx: &mut DurableContext<'_>,
    lakehouse: &dyn Lakehouse,
    config: &WapConfig,
) -> Result<FlowOutcome, WapError> {
    // THIS IS THE WRITE
    ctx.step("create_branch", move || steps::reset_branch(lakehouse, config))
        .await?;
    ctx.step("ingest", move || steps::ingest(lakehouse, config))
        .await?;

    // THIS IS THE AUDIT
    let audit = ctx
        .step("audit", move || steps::run_quality_checks(lakehouse, config))
        .await?;

    if !audit.passed {
        // "Roll-back": drop the branch, main never saw the data
        info!(nulls = audit.null_count, "Check failed, cleaning up the branch");
        ctx.step("rollback", move || {
            steps::delete_branch(lakehouse, &config.branch_name)
        })
        .await?;
        error!("Flow failed, clean-up done at {}!", Utc::now());
        return Ok(FlowOutcome::RolledBack { audit });
    }

    // THIS IS THE PUBLISH
    let merge = ctx
        .step("publish", move || steps::merge_branch(lakehouse, config))
        .await?;
    ctx.step("cleanup", move || {
        steps::delete_branch(lakehouse, &config.branch_name)
    })
    .await?;

    info!("All done at {}, see you, space cowboy.", Utc::now());
    Ok(FlowOutcome::Published { audit, merge })
}

/// Best effort: a failing lakehouse may refuse this too, the error is logged only.
async fn cleanup_after_failure(lakehouse: &dyn Lakehouse, branch: &str) {
    match lakehouse.delete_branch(branch).await {
        Ok(true) => warn!(branch, "Ephemeral branch removed after failure"),
        Ok(false) => {}
        Err(e) => warn!(branch, error = %e, "Could not remove branch after failure"),
    }
}

fn recorded_result(run: WorkflowRun) -> Result<FlowOutcome, WapError> {
    info!(status = run.status.as_str(), "Workflow already finished, returning recorded result");
    match (run.status, run.outcome) {
        (WorkflowStatus::Published | WorkflowStatus::RolledBack, Some(outcome)) => Ok(outcome),
        _ => Err(DomainError::WorkflowFailed {
            workflow_id: run.workflow_id,
            reason: run.error.unwrap_or_else(|| "unknown error".to_string()),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::StepStatus;
    use crate::infrastructure::error::InfrastructureError;
    use crate::infrastructure::journal::FileJournal;
    use crate::ports::lakehouse::{MergeReceipt, ScanResult, TableRef};
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tempfile::tempdir;

    // --- MOCK LAKEHOUSE ---
    #[derive(Default)]
    struct MockLakehouse {
        branches: Mutex<HashSet<String>>,
        calls: Mutex<Vec<String>>,
        column_values: Vec<serde_json::Value>,
        fail_imports: bool,
    }

    impl MockLakehouse {
        fn with_values(values: Vec<serde_json::Value>) -> Self {
            let mock = Self {
                column_values: values,
                ..Default::default()
            };
            mock.seed_branch("main");
            mock
        }

        fn seed_branch(&self, name: &str) {
            if let Ok(mut b) = self.branches.lock() {
                b.insert(name.to_string());
            }
        }

        fn record(&self, call: String) {
            if let Ok(mut c) = self.calls.lock() {
                c.push(call);
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }

        fn count(&self, prefix: &str) -> usize {
            self.calls().iter().filter(|c| c.starts_with(prefix)).count()
        }

        fn branch_exists(&self, name: &str) -> bool {
            self.branches
                .lock()
                .map(|b| b.contains(name))
                .unwrap_or(false)
        }
    }

    #[async_trait]
    impl Lakehouse for MockLakehouse {
        async fn has_branch(&self, branch: &str) -> Result<bool, WapError> {
            Ok(self.branch_exists(branch))
        }

        async fn create_branch(&self, branch: &str, from_ref: &str) -> Result<(), WapError> {
            self.record(format!("create_branch:{}:{}", branch, from_ref));
            if self.branch_exists(branch) {
                return Err(InfrastructureError::Api {
                    status: 409,
                    message: "branch already exists".into(),
                }
                .into());
            }
            self.seed_branch(branch);
            Ok(())
        }

        async fn delete_branch(&self, branch: &str) -> Result<bool, WapError> {
            self.record(format!("delete_branch:{}", branch));
            Ok(self
                .branches
                .lock()
                .map(|mut b| b.remove(branch))
                .unwrap_or(false))
        }

        async fn merge_branch(
            &self,
            source_ref: &str,
            into_branch: &str,
        ) -> Result<MergeReceipt, WapError> {
            self.record(format!("merge_branch:{}:{}", source_ref, into_branch));
            Ok(MergeReceipt {
                source_ref: source_ref.into(),
                into_branch: into_branch.into(),
                commit: Some("c0ffee".into()),
            })
        }

        async fn has_namespace(&self, _namespace: &str, _reference: &str) -> Result<bool, WapError> {
            Ok(false)
        }

        async fn create_namespace(&self, namespace: &str, branch: &str) -> Result<(), WapError> {
            self.record(format!("create_namespace:{}:{}", namespace, branch));
            Ok(())
        }

        async fn create_table(
            &self,
            table: &TableRef,
            search_uri: &str,
            branch: &str,
            replace: bool,
        ) -> Result<(), WapError> {
            self.record(format!(
                "create_table:{}:{}:{}:{}",
                table.fq_name(),
                search_uri,
                branch,
                replace
            ));
            Ok(())
        }

        async fn has_table(&self, _table: &TableRef, _reference: &str) -> Result<bool, WapError> {
            Ok(true)
        }

        async fn import_data(
            &self,
            table: &TableRef,
            _search_uri: &str,
            branch: &str,
        ) -> Result<bool, WapError> {
            self.record(format!("import_data:{}:{}", table.fq_name(), branch));
            if self.fail_imports {
                return Err(InfrastructureError::Api {
                    status: 400,
                    message: "no parquet files".into(),
                }
                .into());
            }
            Ok(true)
        }

        async fn scan(
            &self,
            _table: &TableRef,
            reference: &str,
            columns: &[String],
        ) -> Result<ScanResult, WapError> {
            self.record(format!("scan:{}", reference));
            Ok(ScanResult {
                columns: columns.to_vec(),
                rows: self.column_values.iter().map(|v| vec![v.clone()]).collect(),
            })
        }

        fn backend_name(&self) -> &str {
            "mock"
        }
    }

    fn trips_config() -> WapConfig {
        WapConfig::new("trips", "ingest-2024", "s3://bucket/trips/", "bauplan")
    }

    fn options() -> FlowOptions {
        FlowOptions {
            retry: RetryConfig::no_retry(),
            cleanup_on_error: true,
        }
    }

    #[tokio::test]
    async fn test_clean_data_is_published() -> Result<()> {
        let dir = tempdir()?;
        let journal = FileJournal::open(dir.path())?;
        let lakehouse = MockLakehouse::with_values(vec![json!(1), json!(2), json!(4)]);

        let outcome = run_wap_flow(
            &lakehouse,
            &journal,
            FlowRequest::adhoc(trips_config()),
            &options(),
        )
        .await?;

        assert!(outcome.is_published());
        assert_eq!(lakehouse.count("merge_branch:ingest-2024:main"), 1);
        assert_eq!(lakehouse.count("delete_branch:ingest-2024"), 1);
        assert!(!lakehouse.branch_exists("ingest-2024"));

        // Merge strictly before the cleanup
        let calls = lakehouse.calls();
        let merge_at = calls.iter().position(|c| c.starts_with("merge_branch"));
        let delete_at = calls.iter().rposition(|c| c.starts_with("delete_branch"));
        assert!(merge_at < delete_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_null_values_roll_back() -> Result<()> {
        let dir = tempdir()?;
        let journal = FileJournal::open(dir.path())?;
        let lakehouse = MockLakehouse::with_values(vec![json!(1), json!(null), json!(3)]);

        let request = FlowRequest::adhoc(trips_config());
        let id = request.workflow_id.clone();
        let outcome = run_wap_flow(&lakehouse, &journal, request, &options()).await?;

        assert!(matches!(outcome, FlowOutcome::RolledBack { ref audit } if audit.null_count == 1));
        assert_eq!(lakehouse.count("merge_branch"), 0);
        assert_eq!(lakehouse.count("delete_branch:ingest-2024"), 1);
        assert!(!lakehouse.branch_exists("ingest-2024"));
        assert!(lakehouse.branch_exists("main"));

        let run = journal.load(&id)?.ok_or_else(|| anyhow::anyhow!("missing run"))?;
        assert_eq!(run.status, WorkflowStatus::RolledBack);
        let names: Vec<_> = run.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["create_branch", "ingest", "audit", "rollback"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_existing_branch_is_reset() -> Result<()> {
        let dir = tempdir()?;
        let journal = FileJournal::open(dir.path())?;
        let lakehouse = MockLakehouse::with_values(vec![json!(1)]);
        lakehouse.seed_branch("ingest-2024");

        let outcome = run_wap_flow(
            &lakehouse,
            &journal,
            FlowRequest::adhoc(trips_config()),
            &options(),
        )
        .await?;

        assert!(outcome.is_published());
        assert_eq!(lakehouse.calls()[0], "delete_branch:ingest-2024");
        assert_eq!(lakehouse.calls()[1], "create_branch:ingest-2024:main");

        // And once more with the same branch name
        run_wap_flow(
            &lakehouse,
            &journal,
            FlowRequest::adhoc(trips_config()),
            &options(),
        )
        .await?;
        assert_eq!(lakehouse.count("merge_branch"), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_ingest_targets_the_branch() -> Result<()> {
        let dir = tempdir()?;
        let journal = FileJournal::open(dir.path())?;
        let lakehouse = MockLakehouse::with_values(vec![json!(1)]);

        run_wap_flow(
            &lakehouse,
            &journal,
            FlowRequest::adhoc(trips_config()),
            &options(),
        )
        .await?;

        let calls = lakehouse.calls();
        assert!(calls.contains(&"create_namespace:bauplan:ingest-2024".to_string()));
        assert!(calls.contains(
            &"create_table:bauplan.trips:s3://bucket/trips/:ingest-2024:true".to_string()
        ));
        assert!(calls.contains(&"import_data:bauplan.trips:ingest-2024".to_string()));
        assert!(calls.contains(&"scan:ingest-2024".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_finished_workflow_is_not_rerun() -> Result<()> {
        let dir = tempdir()?;
        let journal = FileJournal::open(dir.path())?;
        let lakehouse = MockLakehouse::with_values(vec![json!(1)]);

        let request = FlowRequest {
            workflow_id: "wap-1714557600".into(),
            config: trips_config(),
            scheduled_for: Some(Utc::now()),
        };
        let first = run_wap_flow(&lakehouse, &journal, request.clone(), &options()).await?;
        let calls_after_first = lakehouse.calls().len();

        let second = run_wap_flow(&lakehouse, &journal, request, &options()).await?;
        assert_eq!(first, second);
        assert_eq!(lakehouse.calls().len(), calls_after_first);
        Ok(())
    }

    #[tokio::test]
    async fn test_pending_workflow_resumes_after_audit() -> Result<()> {
        let dir = tempdir()?;
        let journal = FileJournal::open(dir.path())?;
        let lakehouse = MockLakehouse::with_values(vec![json!(1)]);
        lakehouse.seed_branch("ingest-2024");

        // A crash right after the audit: three steps on record, status still pending
        let mut run = WorkflowRun::new("wap-crashed", trips_config(), None);
        let mut ctx = DurableContext::new(&journal, run.clone(), RetryConfig::no_retry());
        ctx.step("create_branch", || async { Ok(false) }).await?;
        ctx.step("ingest", || async { Ok(true) }).await?;
        let audit = crate::domain::wap::AuditReport {
            table: "bauplan.trips".into(),
            column: "passenger_count".into(),
            rows_scanned: 1,
            null_count: 0,
            passed: true,
        };
        let recorded = audit.clone();
        ctx.step("audit", move || {
            let a = recorded.clone();
            async move { Ok(a) }
        })
        .await?;
        run = ctx.run().clone();
        assert_eq!(run.status, WorkflowStatus::Pending);

        let outcome = run_wap_flow(
            &lakehouse,
            &journal,
            FlowRequest {
                workflow_id: "wap-crashed".into(),
                config: trips_config(),
                scheduled_for: None,
            },
            &options(),
        )
        .await?;

        assert!(outcome.is_published());
        // Only publish + cleanup touched the lakehouse
        assert_eq!(
            lakehouse.calls(),
            vec![
                "merge_branch:ingest-2024:main".to_string(),
                "delete_branch:ingest-2024".to_string()
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_cleans_branch_and_marks_failed() -> Result<()> {
        let dir = tempdir()?;
        let journal = FileJournal::open(dir.path())?;
        let lakehouse = MockLakehouse {
            fail_imports: true,
            ..MockLakehouse::with_values(vec![])
        };

        let request = FlowRequest::adhoc(trips_config());
        let id = request.workflow_id.clone();
        let err = run_wap_flow(&lakehouse, &journal, request.clone(), &options()).await;

        assert!(err.is_err());
        assert_eq!(lakehouse.count("merge_branch"), 0);
        assert!(!lakehouse.branch_exists("ingest-2024"));

        let run = journal.load(&id)?.ok_or_else(|| anyhow::anyhow!("missing run"))?;
        assert_eq!(run.status, WorkflowStatus::Failed);
        assert_eq!(run.steps.last().map(|s| s.status), Some(StepStatus::Failed));

        // Same id again: the recorded failure, no new lakehouse calls
        let calls = lakehouse.calls().len();
        let again = run_wap_flow(&lakehouse, &journal, request, &options()).await;
        assert!(matches!(
            again,
            Err(WapError::Domain(DomainError::WorkflowFailed { .. }))
        ));
        assert_eq!(lakehouse.calls().len(), calls);
        Ok(())
    }

    #[tokio::test]
    async fn test_main_branch_never_touched_as_ephemeral() -> Result<()> {
        let dir = tempdir()?;
        let journal = FileJournal::open(dir.path())?;
        let lakehouse = MockLakehouse::with_values(vec![json!(1)]);
        let config = WapConfig::new("trips", "main", "s3://bucket/trips/", "bauplan");

        let err = run_wap_flow(&lakehouse, &journal, FlowRequest::adhoc(config), &options()).await;
        assert!(matches!(
            err,
            Err(WapError::Domain(DomainError::ProtectedBranch(_)))
        ));
        assert!(lakehouse.calls().is_empty());
        assert!(lakehouse.branch_exists("main"));
        Ok(())
    }

    #[tokio::test]
    async fn test_trips_example_publishes_without_rollback() -> Result<()> {
        let dir = tempdir()?;
        let journal = FileJournal::open(dir.path())?;
        let lakehouse = MockLakehouse::with_values(vec![json!(1), json!(3), json!(2)]);

        let request = FlowRequest::adhoc(trips_config());
        let id = request.workflow_id.clone();
        let outcome = run_wap_flow(&lakehouse, &journal, request, &options()).await?;

        assert!(outcome.audit().passed);
        assert_eq!(outcome.audit().column, "passenger_count");
        assert_eq!(lakehouse.count("merge_branch:ingest-2024:main"), 1);
        assert_eq!(lakehouse.count("delete_branch:ingest-2024"), 1);

        let run = journal.load(&id)?.ok_or_else(|| anyhow::anyhow!("missing run"))?;
        let names: Vec<_> = run.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["create_branch", "ingest", "audit", "publish", "cleanup"]
        );
        assert!(!names.contains(&"rollback"));
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_keeps_branch_without_cleanup_on_error() -> Result<()> {
        let dir = tempdir()?;
        let journal = FileJournal::open(dir.path())?;
        let lakehouse = MockLakehouse {
            fail_imports: true,
            ..MockLakehouse::with_values(vec![])
        };
        let keep = FlowOptions {
            retry: RetryConfig::no_retry(),
            cleanup_on_error: false,
        };

        let request = FlowRequest::adhoc(trips_config());
        let id = request.workflow_id.clone();
        assert!(run_wap_flow(&lakehouse, &journal, request, &keep).await.is_err());

        // Left in place for inspection
        assert!(lakehouse.branch_exists("ingest-2024"));
        assert_eq!(lakehouse.count("delete_branch"), 0);
        assert_eq!(lakehouse.count("merge_branch"), 0);

        let run = journal.load(&id)?.ok_or_else(|| anyhow::anyhow!("missing run"))?;
        assert_eq!(run.status, WorkflowStatus::Failed);
        Ok(())
    }

    #[tokio::test]
    async fn test_unsafe_workflow_id_is_refused() -> Result<()> {
        let dir = tempdir()?;
        let journal = FileJournal::open(dir.path())?;
        let lakehouse = MockLakehouse::with_values(vec![json!(1)]);

        let ok = FlowRequest {
            workflow_id: "wap_1".into(),
            config: trips_config(),
            scheduled_for: None,
        };
        run_wap_flow(&lakehouse, &journal, ok, &options()).await?;
        let calls = lakehouse.calls().len();

        let clashing = FlowRequest {
            workflow_id: "wap/1".into(),
            config: trips_config(),
            scheduled_for: None,
        };
        let err = run_wap_flow(&lakehouse, &journal, clashing, &options()).await;
        assert!(matches!(
            err,
            Err(WapError::Infrastructure(InfrastructureError::InvalidWorkflowId(_)))
        ));
        assert_eq!(lakehouse.calls().len(), calls);
        Ok(())
    }
}
