// wap/src/commands/schedule.rs
//
// USE CASE: Run the WAP flow on a cron schedule.

use std::path::PathBuf;

use chrono::Utc;
use tracing::warn;
use wap_core::application::Scheduler;
use wap_core::domain::CronSchedule;
use wap_core::infrastructure::config::{FlowOverrides, resolve_flow_config};

use crate::cli::FlowArgs;
use crate::commands::bootstrap;

pub async fn execute(
    config: Option<PathBuf>,
    flow: FlowArgs,
    cron: Option<String>,
    no_recover: bool,
) -> anyhow::Result<()> {
    let ctx = bootstrap(config.as_deref())?;

    let expression = cron.unwrap_or_else(|| ctx.settings.schedule.clone());
    let schedule = CronSchedule::parse(&expression)?;
    println!("⏰ Schedule: {}", schedule.expression());
    if let Some(next) = schedule.next_after(Utc::now()) {
        println!("   Next run: {}", next);
    }

    // Inputs are re-read at every tick; a bad environment now is only a warning
    let settings = ctx.settings.clone();
    let overrides = FlowOverrides::from(flow);
    let resolve = move || resolve_flow_config(&settings, &overrides, |k| std::env::var(k).ok());
    if let Err(e) = resolve() {
        println!("⚠️  Flow inputs are not valid yet: {}", e);
    }

    let scheduler = Scheduler::new(ctx.lakehouse, ctx.journal, schedule, ctx.options);

    if !no_recover {
        let resumed = scheduler.recover_pending().await?;
        if resumed > 0 {
            println!("🔁 {} pending workflow(s) resumed.", resumed);
        }
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl-C, the scheduler runs until killed");
            std::future::pending::<()>().await;
        }
        println!("\n🛑 Ctrl-C received, stopping...");
    };

    scheduler.run_until(resolve, shutdown).await?;
    println!("👋 Scheduler stopped.");
    Ok(())
}
