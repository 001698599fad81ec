// wap-core/src/application/durable.rs
//
// Durable steps: every step output is journaled, a resumed workflow replays
// the recorded outputs instead of calling the lakehouse a second time.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::domain::error::DomainError;
use crate::domain::wap::FlowOutcome;
use crate::domain::workflow::{RetryConfig, StepRecord, StepStatus, WorkflowRun};
use crate::error::{IsRetryable, WapError};
use crate::ports::journal::WorkflowJournal;

pub struct DurableContext<'a> {
    journal: &'a dyn WorkflowJournal,
    run: WorkflowRun,
    retry: RetryConfig,
    next_seq: u32,
}

impl<'a> DurableContext<'a> {
    pub fn new(journal: &'a dyn WorkflowJournal, run: WorkflowRun, retry: RetryConfig) -> Self {
        Self {
            journal,
            run,
            retry,
            next_seq: 0,
        }
    }

    pub fn run(&self) -> &WorkflowRun {
        &self.run
    }

    pub fn workflow_id(&self) -> &str {
        &self.run.workflow_id
    }

    /// Runs (or replays) the next step of the workflow.
    pub async fn step<T, F, Fut>(&mut self, name: &str, mut op: F) -> Result<T, WapError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, WapError>>,
    {
        let seq = self.next_seq;
        self.next_seq += 1;

        if let Some(record) = self.run.completed_step(seq) {
            if record.name != name {
                return Err(DomainError::NonDeterministicReplay {
                    workflow_id: self.run.workflow_id.clone(),
                    seq,
                    expected: record.name.clone(),
                    found: name.to_string(),
                }
                .into());
            }
            info!(step = name, seq, "Replaying recorded step output");
            return Ok(serde_json::from_value(record.output.clone())?);
        }

        let started_at = Utc::now();
        let (result, attempts) = retry_with_backoff(&self.retry, name, &mut op).await;
        let finished_at = Utc::now();

        let record = match &result {
            Ok(value) => StepRecord {
                seq,
                name: name.to_string(),
                status: StepStatus::Completed,
                attempts,
                output: serde_json::to_value(value)?,
                error: None,
                started_at,
                finished_at,
            },
            Err(e) => StepRecord {
                seq,
                name: name.to_string(),
                status: StepStatus::Failed,
                attempts,
                output: serde_json::Value::Null,
                error: Some(e.to_string()),
                started_at,
                finished_at,
            },
        };
        self.run.record_step(record);
        self.journal.save(&self.run)?;

        result
    }

    pub fn complete(mut self, outcome: FlowOutcome) -> Result<WorkflowRun, WapError> {
        self.run.complete(outcome);
        self.journal.save(&self.run)?;
        Ok(self.run)
    }

    pub fn fail(mut self, reason: impl Into<String>) -> Result<WorkflowRun, WapError> {
        self.run.fail(reason);
        self.journal.save(&self.run)?;
        Ok(self.run)
    }
}

fn to_exponential_backoff(config: &RetryConfig) -> ExponentialBackoff {
    let mut backoff = ExponentialBackoff {
        initial_interval: Duration::from_millis(config.initial_delay_ms),
        max_interval: Duration::from_millis(config.max_delay_ms),
        multiplier: config.multiplier,
        max_elapsed_time: None,
        ..Default::default()
    };

    if !config.jitter {
        backoff.randomization_factor = 0.0;
    }

    backoff
}

/// Retries transient failures with exponential backoff.
/// Returns the last result together with the number of attempts made.
pub async fn retry_with_backoff<T, F, Fut>(
    config: &RetryConfig,
    step: &str,
    op: &mut F,
) -> (Result<T, WapError>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, WapError>>,
{
    let mut backoff = to_exponential_backoff(config);
    let mut attempt = 1;

    loop {
        debug!(step, attempt, max = config.max_attempts, "Executing step");

        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(step, attempt, "Step succeeded after retries");
                }
                return (Ok(value), attempt);
            }
            Err(error) => {
                if attempt >= config.max_attempts || !error.is_retryable() {
                    warn!(step, attempt, error = %error, "Step failed");
                    return (Err(error), attempt);
                }

                match backoff.next_backoff() {
                    Some(delay) => {
                        warn!(
                            step,
                            attempt,
                            error = %error,
                            "Step failed (attempt {}/{}), retrying in {:?}",
                            attempt,
                            config.max_attempts,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        warn!(step, attempt, "Backoff exhausted");
                        return (Err(error), attempt);
                    }
                }
            }
        }
    }
}
