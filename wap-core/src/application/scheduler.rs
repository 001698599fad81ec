// wap-core/src/application/scheduler.rs
//
// Cron trigger for the WAP flow. One run per tick, identified by the tick
// itself so that a restarted process never executes the same tick twice.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::application::flow::{FlowOptions, FlowRequest, run_wap_flow};
use crate::domain::wap::{FlowOutcome, WapConfig};
use crate::domain::workflow::{CronSchedule, WAP_WORKFLOW_NAME, WorkflowStatus};
use crate::error::WapError;
use crate::ports::journal::WorkflowJournal;
use crate::ports::lakehouse::Lakehouse;

const MAX_REPORTED_MISSED_TICKS: usize = 1_000;

pub struct Scheduler {
    lakehouse: Arc<dyn Lakehouse>,
    journal: Arc<dyn WorkflowJournal>,
    schedule: CronSchedule,
    options: FlowOptions,
}

impl Scheduler {
    pub fn new(
        lakehouse: Arc<dyn Lakehouse>,
        journal: Arc<dyn WorkflowJournal>,
        schedule: CronSchedule,
        options: FlowOptions,
    ) -> Self {
        Self {
            lakehouse,
            journal,
            schedule,
            options,
        }
    }

    pub fn schedule(&self) -> &CronSchedule {
        &self.schedule
    }

    /// Deterministic id of the run fired at `tick`.
    pub fn workflow_id_for(tick: DateTime<Utc>) -> String {
        format!("wap-{}", tick.timestamp())
    }

    /// Resumes every pending WAP run left behind by a previous process.
    /// Returns how many runs were resumed (whatever their outcome).
    pub async fn recover_pending(&self) -> Result<usize, WapError> {
        let pending: Vec<_> = self
            .journal
            .list()?
            .into_iter()
            .filter(|r| r.workflow_name == WAP_WORKFLOW_NAME && r.status == WorkflowStatus::Pending)
            .collect();

        if pending.is_empty() {
            return Ok(0);
        }
        info!(count = pending.len(), "Recovering pending workflows");

        let mut resumed = 0;
        for run in pending {
            let request = FlowRequest {
                workflow_id: run.workflow_id.clone(),
                config: run.config,
                scheduled_for: run.scheduled_for,
            };
            match run_wap_flow(
                self.lakehouse.as_ref(),
                self.journal.as_ref(),
                request,
                &self.options,
            )
            .await
            {
                Ok(outcome) => info!(
                    workflow_id = %run.workflow_id,
                    published = outcome.is_published(),
                    "Recovered workflow finished"
                ),
                Err(e) => error!(workflow_id = %run.workflow_id, error = %e, "Recovered workflow failed"),
            }
            resumed += 1;
        }
        Ok(resumed)
    }

    /// Executes the flow for a single tick. Inputs are resolved now, not at boot.
    pub async fn run_tick<F>(&self, tick: DateTime<Utc>, resolve: &F) -> Result<FlowOutcome, WapError>
    where
        F: Fn() -> Result<WapConfig, WapError>,
    {
        let request = FlowRequest {
            workflow_id: Self::workflow_id_for(tick),
            config: resolve()?,
            scheduled_for: Some(tick),
        };
        run_wap_flow(
            self.lakehouse.as_ref(),
            self.journal.as_ref(),
            request,
            &self.options,
        )
        .await
    }

    /// Main loop. Ticks run one at a time; `shutdown` is only honoured between
    /// runs so an in-flight flow always reaches a recorded state.
    pub async fn run_until<F, S>(&self, resolve: F, shutdown: S) -> Result<(), WapError>
    where
        F: Fn() -> Result<WapConfig, WapError>,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(schedule = %self.schedule.expression(), "Scheduler started");

        loop {
            let now = Utc::now();
            let Some(tick) = self.schedule.next_after(now) else {
                warn!("Schedule has no upcoming tick, stopping");
                return Ok(());
            };
            let wait = (tick - now).to_std().unwrap_or_default();

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, scheduler stopped");
                    return Ok(());
                }
                _ = tokio::time::sleep(wait) => {}
            }

            match self.run_tick(tick, &resolve).await {
                Ok(FlowOutcome::Published { .. }) => info!(%tick, "Tick published"),
                Ok(FlowOutcome::RolledBack { audit }) => {
                    warn!(%tick, nulls = audit.null_count, "Tick rolled back")
                }
                // A failing tick never stops the loop
                Err(e) => error!(%tick, error = %e, "Tick failed"),
            }

            let missed = self
                .schedule
                .ticks_between(tick, Utc::now(), MAX_REPORTED_MISSED_TICKS)
                .len();
            if missed > 0 {
                warn!(missed, "Run overlapped later ticks, they are skipped");
            }
        }
    }
}
