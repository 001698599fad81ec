// wap/src/commands/resume.rs
//
// USE CASE: Resume pending workflows after a crash.

use std::path::PathBuf;

use wap_core::application::{FlowRequest, Scheduler, run_wap_flow};
use wap_core::domain::CronSchedule;
use wap_core::ports::journal::WorkflowJournal;

use crate::commands::bootstrap;

pub async fn execute(config: Option<PathBuf>, workflow_id: Option<String>) -> anyhow::Result<()> {
    let ctx = bootstrap(config.as_deref())?;

    match workflow_id {
        Some(id) => {
            let Some(run) = ctx.journal.load(&id)? else {
                anyhow::bail!("❌ Unknown workflow '{}'\n👉 See 'wap status'", id);
            };
            println!("🔁 Resuming {} ({})", id, run.status.as_str());

            let request = FlowRequest {
                workflow_id: run.workflow_id,
                config: run.config,
                scheduled_for: run.scheduled_for,
            };
            let outcome = run_wap_flow(
                ctx.lakehouse.as_ref(),
                ctx.journal.as_ref(),
                request,
                &ctx.options,
            )
            .await?;

            if outcome.is_published() {
                println!("✨ {} published.", id);
            } else {
                println!("⚠️  {} rolled back ({} null values).", id, outcome.audit().null_count);
            }
        }
        None => {
            let schedule = CronSchedule::parse(&ctx.settings.schedule)?;
            let scheduler = Scheduler::new(ctx.lakehouse, ctx.journal, schedule, ctx.options);
            let resumed = scheduler.recover_pending().await?;
            if resumed == 0 {
                println!("✅ Nothing to resume.");
            } else {
                println!("✨ {} workflow(s) resumed, see 'wap status'.", resumed);
            }
        }
    }

    Ok(())
}
