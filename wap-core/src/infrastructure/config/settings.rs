// wap-core/src/infrastructure/config/settings.rs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use validator::Validate;

use crate::domain::wap::{DEFAULT_AUDIT_COLUMN, DEFAULT_MAIN_BRANCH, DEFAULT_NAMESPACE};
use crate::domain::workflow::RetryConfig;
use crate::domain::workflow::schedule::DEFAULT_SCHEDULE;
use crate::infrastructure::error::InfrastructureError;

/// Which lakehouse adapter runs the flow.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Remote,
    DuckDB,
}

impl std::str::FromStr for Backend {
    type Err = InfrastructureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "remote" | "http" => Ok(Backend::Remote),
            "duckdb" | "local" => Ok(Backend::DuckDB),
            other => Err(InfrastructureError::ConfigError(format!(
                "Unknown lakehouse backend '{}' (expected 'remote' or 'duckdb')",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Validate)]
pub struct LakehouseSettings {
    #[serde(default)]
    pub backend: Backend,

    #[validate(url(message = "lakehouse.url must be a valid URL"))]
    #[serde(default)]
    pub url: Option<String>,

    /// Name of the env var holding the API key (never the key itself)
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,

    #[validate(range(min = 1, message = "timeout_secs must be positive"))]
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for LakehouseSettings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            url: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Validate)]
pub struct WapSettings {
    #[serde(default = "default_name")]
    pub name: String,

    #[validate(nested)]
    #[serde(default)]
    pub lakehouse: LakehouseSettings,

    #[validate(length(min = 1, message = "schedule cannot be empty"))]
    #[serde(default = "default_schedule")]
    pub schedule: String,

    #[serde(default = "default_main_branch")]
    pub main_branch: String,

    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    #[serde(default = "default_audit_column")]
    pub audit_column: String,

    #[serde(default = "default_journal_path")]
    pub journal_path: String,

    #[serde(default = "default_true")]
    pub cleanup_on_error: bool,

    #[validate(nested)]
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for WapSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            lakehouse: LakehouseSettings::default(),
            schedule: default_schedule(),
            main_branch: default_main_branch(),
            default_namespace: default_namespace(),
            audit_column: default_audit_column(),
            journal_path: default_journal_path(),
            cleanup_on_error: true,
            retry: RetryConfig::default(),
        }
    }
}

// --- LOADER ---

/// Loads the settings file, then layers env overrides on top.
///
/// With no explicit path, `wap.yaml`/`wap.yml` is looked up in `base_dir`
/// and the defaults apply when neither exists. An explicit path must exist.
#[instrument(skip(base_dir))]
pub fn load_settings(
    explicit: Option<&Path>,
    base_dir: &Path,
) -> Result<WapSettings, InfrastructureError> {
    let path = match explicit {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => return Err(InfrastructureError::ConfigNotFound(p.display().to_string())),
        None => find_settings_file(base_dir),
    };

    let mut settings = match path {
        Some(path) => {
            info!(path = ?path, "Loading settings");
            let content = fs::read_to_string(&path)?;
            serde_yaml::from_str::<WapSettings>(&content)?
        }
        None => {
            info!("No settings file found, using defaults");
            WapSettings::default()
        }
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;

    settings
        .validate()
        .map_err(|e| InfrastructureError::ConfigError(e.to_string()))?;

    Ok(settings)
}

fn find_settings_file(root: &Path) -> Option<PathBuf> {
    ["wap.yaml", "wap.yml"]
        .iter()
        .map(|f| root.join(f))
        .find(|p| p.exists())
}

/// Pattern 'Layering': WAP_BACKEND=duckdb wap run ...
pub fn apply_env_overrides<F>(
    settings: &mut WapSettings,
    lookup: F,
) -> Result<(), InfrastructureError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("WAP_BACKEND") {
        let backend = val.parse::<Backend>()?;
        info!(old = ?settings.lakehouse.backend, new = ?backend, "Overriding backend via ENV");
        settings.lakehouse.backend = backend;
    }
    if let Some(val) = lookup("WAP_LAKEHOUSE_URL") {
        info!(new = %val, "Overriding lakehouse url via ENV");
        settings.lakehouse.url = Some(val);
    }
    if let Some(val) = lookup("WAP_DB_PATH") {
        info!(old = %settings.lakehouse.db_path, new = %val, "Overriding db path via ENV");
        settings.lakehouse.db_path = val;
    }
    if let Some(val) = lookup("WAP_SCHEDULE") {
        info!(old = %settings.schedule, new = %val, "Overriding schedule via ENV");
        settings.schedule = val;
    }
    if let Some(val) = lookup("WAP_JOURNAL_PATH") {
        info!(old = %settings.journal_path, new = %val, "Overriding journal path via ENV");
        settings.journal_path = val;
    }
    Ok(())
}

fn default_name() -> String {
    "wap".to_string()
}
fn default_api_key_env() -> Option<String> {
    Some("LAKEHOUSE_API_KEY".to_string())
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_db_path() -> String {
    "wap_lakehouse.duckdb".to_string()
}
fn default_schedule() -> String {
    DEFAULT_SCHEDULE.to_string()
}
fn default_main_branch() -> String {
    DEFAULT_MAIN_BRANCH.to_string()
}
fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}
fn default_audit_column() -> String {
    DEFAULT_AUDIT_COLUMN.to_string()
}
fn default_journal_path() -> String {
    ".wap/runs".to_string()
}
fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_file() -> Result<()> {
        let dir = tempdir()?;
        let settings = load_settings(None, dir.path())?;
        assert_eq!(settings.schedule, "*/1 * * * *");
        assert_eq!(settings.main_branch, "main");
        assert_eq!(settings.retry.max_attempts, 3);
        assert!(settings.cleanup_on_error);
        Ok(())
    }

    #[test]
    fn test_yaml_file_is_loaded() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(
            dir.path().join("wap.yaml"),
            r#"
name: taxi-ingestion
lakehouse:
  backend: duckdb
  db_path: lake.duckdb
schedule: "*/5 * * * *"
audit_column: trip_distance
retry:
  max_attempts: 5
"#,
        )?;

        let settings = load_settings(None, dir.path())?;
        assert_eq!(settings.name, "taxi-ingestion");
        assert_eq!(settings.lakehouse.backend, Backend::DuckDB);
        assert_eq!(settings.lakehouse.db_path, "lake.duckdb");
        assert_eq!(settings.audit_column, "trip_distance");
        assert_eq!(settings.retry.max_attempts, 5);
        // Unspecified retry fields keep their defaults
        assert_eq!(settings.retry.initial_delay_ms, 500);
        Ok(())
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let missing = dir.path().join("nope.yaml");
        let err = load_settings(Some(&missing), dir.path());
        assert!(matches!(err, Err(InfrastructureError::ConfigNotFound(_))));
        Ok(())
    }

    #[test]
    fn test_invalid_retry_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("custom.yml");
        std::fs::write(&path, "retry:\n  max_attempts: 0\n")?;
        let err = load_settings(Some(&path), dir.path());
        assert!(matches!(err, Err(InfrastructureError::ConfigError(_))));
        Ok(())
    }

    #[test]
    fn test_env_overrides_layer_on_top() -> Result<()> {
        let env: HashMap<&str, &str> = HashMap::from([
            ("WAP_BACKEND", "duckdb"),
            ("WAP_SCHEDULE", "0 * * * *"),
            ("WAP_JOURNAL_PATH", "/tmp/runs"),
        ]);
        let mut settings = WapSettings::default();
        apply_env_overrides(&mut settings, |k| env.get(k).map(|v| v.to_string()))?;

        assert_eq!(settings.lakehouse.backend, Backend::DuckDB);
        assert_eq!(settings.schedule, "0 * * * *");
        assert_eq!(settings.journal_path, "/tmp/runs");
        Ok(())
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut settings = WapSettings::default();
        let err = apply_env_overrides(&mut settings, |k| {
            (k == "WAP_BACKEND").then(|| "snowflake".to_string())
        });
        assert!(matches!(err, Err(InfrastructureError::ConfigError(_))));
    }
}
