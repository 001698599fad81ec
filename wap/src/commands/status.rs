// wap/src/commands/status.rs
//
// USE CASE: Inspect the workflow journal.

use std::path::PathBuf;

use anyhow::Context;
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use wap_core::domain::{WorkflowRun, WorkflowStatus};
use wap_core::infrastructure::FileJournal;
use wap_core::ports::journal::WorkflowJournal;

use crate::commands::load;

pub fn execute(
    config: Option<PathBuf>,
    workflow_id: Option<String>,
    limit: usize,
) -> anyhow::Result<()> {
    // No lakehouse needed here, only the journal
    let settings = load(config.as_deref())?;
    let journal = FileJournal::open(&settings.journal_path)
        .with_context(|| format!("Failed to open journal at {}", settings.journal_path))?;

    match workflow_id {
        Some(id) => {
            let Some(run) = journal.load(&id)? else {
                anyhow::bail!("❌ Unknown workflow '{}'", id);
            };
            print_run(&run);
        }
        None => {
            let runs = journal.list()?;
            if runs.is_empty() {
                println!("📭 No workflow recorded in {}", journal.dir().display());
                return Ok(());
            }
            print_runs(&runs, limit);
        }
    }
    Ok(())
}

fn status_label(status: WorkflowStatus) -> String {
    let icon = match status {
        WorkflowStatus::Pending => "⏳",
        WorkflowStatus::Published => "✅",
        WorkflowStatus::RolledBack => "↩️",
        WorkflowStatus::Failed => "❌",
    };
    format!("{} {}", icon, status.as_str())
}

fn print_runs(runs: &[WorkflowRun], limit: usize) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Workflow",
        "Status",
        "Table",
        "Branch",
        "Started",
        "Steps",
    ]);

    for run in runs.iter().take(limit) {
        table.add_row(vec![
            run.workflow_id.clone(),
            status_label(run.status),
            run.config.table().fq_name(),
            run.config.branch_name.clone(),
            run.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            run.steps.len().to_string(),
        ]);
    }

    println!("{table}");
    if runs.len() > limit {
        println!("   ... {} more (use --limit)", runs.len() - limit);
    }
}

fn print_run(run: &WorkflowRun) {
    println!("\n🔍 Workflow '{}' ({})", run.workflow_id, status_label(run.status));
    println!(
        "   Table: {} | Branch: {} -> {}",
        run.config.table().fq_name(),
        run.config.branch_name,
        run.config.main_branch
    );
    if let Some(scheduled) = run.scheduled_for {
        println!("   Scheduled for: {}", scheduled);
    }
    if let Some(error) = &run.error {
        println!("   Error: {}", error);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Step", "Status", "Attempts", "Duration", "Error"]);
    for step in &run.steps {
        let duration = step.finished_at - step.started_at;
        table.add_row(vec![
            step.seq.to_string(),
            step.name.clone(),
            format!("{:?}", step.status),
            step.attempts.to_string(),
            format!("{} ms", duration.num_milliseconds()),
            step.error.clone().unwrap_or_default(),
        ]);
    }
    println!("{table}");
}
