// wap/src/commands/mod.rs

pub mod resume;
pub mod run;
pub mod schedule;
pub mod status;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use wap_core::application::FlowOptions;
use wap_core::infrastructure::FileJournal;
use wap_core::infrastructure::adapters::build_lakehouse;
use wap_core::infrastructure::config::{WapSettings, load_settings};
use wap_core::ports::lakehouse::Lakehouse;

/// Everything a command needs, wired from the settings.
pub struct AppContext {
    pub settings: WapSettings,
    pub lakehouse: Arc<dyn Lakehouse>,
    pub journal: Arc<FileJournal>,
    pub options: FlowOptions,
}

pub fn load(config: Option<&Path>) -> anyhow::Result<WapSettings> {
    let cwd = std::env::current_dir()?;
    let settings = load_settings(config, &cwd).context("Failed to load settings")?;
    Ok(settings)
}

pub fn bootstrap(config: Option<&Path>) -> anyhow::Result<AppContext> {
    println!("⚙️  Loading configuration...");
    let settings = load(config)?;

    let lakehouse = build_lakehouse(&settings.lakehouse)
        .context("Failed to initialize the lakehouse client")?;
    println!("   Lakehouse: {}", lakehouse.backend_name());

    let journal = Arc::new(
        FileJournal::open(&settings.journal_path)
            .with_context(|| format!("Failed to open journal at {}", settings.journal_path))?,
    );

    let options = FlowOptions {
        retry: settings.retry.clone(),
        cleanup_on_error: settings.cleanup_on_error,
    };

    Ok(AppContext {
        settings,
        lakehouse,
        journal,
        options,
    })
}
