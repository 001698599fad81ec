// wap/src/commands/run.rs
//
// USE CASE: Run the WAP flow once.

use std::path::PathBuf;

use anyhow::Context;
use wap_core::application::{FlowRequest, run_wap_flow};
use wap_core::domain::FlowOutcome;
use wap_core::infrastructure::config::{FlowOverrides, resolve_flow_config};

use crate::cli::FlowArgs;
use crate::commands::bootstrap;

pub async fn execute(
    config: Option<PathBuf>,
    flow: FlowArgs,
    workflow_id: Option<String>,
) -> anyhow::Result<()> {
    let start = std::time::Instant::now();

    // A. Settings + adapters (Infra)
    let ctx = bootstrap(config.as_deref())?;

    // B. Flow inputs: flags > env > settings
    let overrides = FlowOverrides::from(flow);
    let wap_config = resolve_flow_config(&ctx.settings, &overrides, |k| std::env::var(k).ok())
        .context("Invalid flow inputs")?;
    println!(
        "   Table: {} | Branch: {} -> {}",
        wap_config.table().fq_name(),
        wap_config.branch_name,
        wap_config.main_branch
    );

    let request = match workflow_id {
        Some(id) => FlowRequest {
            workflow_id: id,
            config: wap_config,
            scheduled_for: None,
        },
        None => FlowRequest::adhoc(wap_config),
    };
    println!("   Workflow: {}", request.workflow_id);

    // C. Run the flow (Application Layer)
    let result = run_wap_flow(
        ctx.lakehouse.as_ref(),
        ctx.journal.as_ref(),
        request,
        &ctx.options,
    )
    .await;
    // Close the lakehouse before a possible exit
    drop(ctx);

    match result {
        Ok(FlowOutcome::Published { audit, merge }) => {
            println!(
                "\n✨ PUBLISHED! {} rows of {} merged into '{}' in {:.2?}",
                audit.rows_scanned,
                audit.table,
                merge.into_branch,
                start.elapsed()
            );
        }
        Ok(FlowOutcome::RolledBack { audit }) => {
            eprintln!(
                "\n❌ ROLLED BACK. {} null value(s) in column '{}', main is untouched.",
                audit.null_count, audit.column
            );
            // Exit with error code for CI/CD
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("\n💥 WAP FLOW ERROR: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
