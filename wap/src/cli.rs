// wap/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use wap_core::infrastructure::config::FlowOverrides;

#[derive(Parser)]
#[command(name = "wap")]
#[command(about = "Scheduled Write-Audit-Publish ingestion for branching lakehouses", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Settings file (default: ./wap.yaml or ./wap.yml)
    #[arg(long, global = true, env = "WAP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flow inputs. Unset flags fall back to TABLE_NAME, BRANCH_NAME, S3_PATH,
/// NAMESPACE and AUDIT_COLUMN, read when the flow starts.
#[derive(Args, Debug, Clone, Default)]
pub struct FlowArgs {
    /// Target table, created on the ephemeral branch
    #[arg(long)]
    pub table_name: Option<String>,

    /// Ephemeral branch holding the written data until publish
    #[arg(long)]
    pub branch_name: Option<String>,

    /// Location of the source files (ex: "s3://bucket/trips/")
    #[arg(long)]
    pub source_uri: Option<String>,

    #[arg(long)]
    pub namespace: Option<String>,

    /// Column that must not contain nulls
    #[arg(long)]
    pub audit_column: Option<String>,
}

impl From<FlowArgs> for FlowOverrides {
    fn from(args: FlowArgs) -> Self {
        FlowOverrides {
            table_name: args.table_name,
            branch_name: args.branch_name,
            source_uri: args.source_uri,
            namespace: args.namespace,
            audit_column: args.audit_column,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🚀 Runs the WAP flow once (Write -> Audit -> Publish)
    Run {
        #[command(flatten)]
        flow: FlowArgs,

        /// Reuse an id to get the recorded result (or resume a pending run)
        #[arg(long)]
        workflow_id: Option<String>,
    },

    /// ⏰ Runs the WAP flow on a cron schedule until Ctrl-C
    Schedule {
        #[command(flatten)]
        flow: FlowArgs,

        /// Cron expression, overrides the settings (ex: "*/5 * * * *")
        #[arg(long)]
        cron: Option<String>,

        /// Do not resume pending runs at startup
        #[arg(long, default_value = "false")]
        no_recover: bool,
    },

    /// 🔁 Resumes pending workflows left by a crashed process
    Resume {
        /// Only this workflow (default: every pending one)
        workflow_id: Option<String>,
    },

    /// 📋 Lists recorded workflow runs, or the steps of one run
    Status {
        workflow_id: Option<String>,

        /// Number of runs to display
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}
