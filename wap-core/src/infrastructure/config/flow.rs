// wap-core/src/infrastructure/config/flow.rs
//
// Per-invocation inputs of the WAP flow. Read every time a run starts, not
// once at boot: a scheduled process picks up new values on its next tick.

use crate::domain::wap::WapConfig;
use crate::error::WapError;
use crate::infrastructure::config::settings::WapSettings;
use crate::infrastructure::error::InfrastructureError;

pub const ENV_TABLE_NAME: &str = "TABLE_NAME";
pub const ENV_BRANCH_NAME: &str = "BRANCH_NAME";
pub const ENV_SOURCE_PATH: &str = "S3_PATH";
pub const ENV_NAMESPACE: &str = "NAMESPACE";
pub const ENV_AUDIT_COLUMN: &str = "AUDIT_COLUMN";

/// Values given explicitly (CLI flags). They win over the environment.
#[derive(Debug, Clone, Default)]
pub struct FlowOverrides {
    pub table_name: Option<String>,
    pub branch_name: Option<String>,
    pub source_uri: Option<String>,
    pub namespace: Option<String>,
    pub audit_column: Option<String>,
}

/// Builds and validates the run inputs: flags > env > settings defaults.
pub fn resolve_flow_config<F>(
    settings: &WapSettings,
    overrides: &FlowOverrides,
    lookup: F,
) -> Result<WapConfig, WapError>
where
    F: Fn(&str) -> Option<String>,
{
    let pick = |explicit: &Option<String>, var: &str| {
        explicit
            .clone()
            .or_else(|| lookup(var))
            .filter(|v| !v.trim().is_empty())
    };

    let required = |explicit: &Option<String>, var: &str| {
        pick(explicit, var).ok_or_else(|| {
            InfrastructureError::ConfigError(format!("Missing required variable {}", var))
        })
    };

    let table_name = required(&overrides.table_name, ENV_TABLE_NAME)?;
    let branch_name = required(&overrides.branch_name, ENV_BRANCH_NAME)?;
    let source_uri = required(&overrides.source_uri, ENV_SOURCE_PATH)?;
    let namespace = pick(&overrides.namespace, ENV_NAMESPACE)
        .unwrap_or_else(|| settings.default_namespace.clone());
    let audit_column = pick(&overrides.audit_column, ENV_AUDIT_COLUMN)
        .unwrap_or_else(|| settings.audit_column.clone());

    let config = WapConfig::new(table_name, branch_name, source_uri, namespace)
        .with_main_branch(settings.main_branch.clone())
        .with_audit_column(audit_column);

    config.ensure_valid()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_reads_the_four_variables() -> anyhow::Result<()> {
        let vars = env(&[
            ("TABLE_NAME", "trips"),
            ("BRANCH_NAME", "ingest-2024"),
            ("S3_PATH", "s3://bucket/trips/"),
            ("NAMESPACE", "taxi"),
        ]);
        let cfg = resolve_flow_config(&WapSettings::default(), &FlowOverrides::default(), |k| {
            vars.get(k).cloned()
        })?;

        assert_eq!(cfg.table_name, "trips");
        assert_eq!(cfg.branch_name, "ingest-2024");
        assert_eq!(cfg.source_uri, "s3://bucket/trips/");
        assert_eq!(cfg.namespace, "taxi");
        assert_eq!(cfg.audit_column, "passenger_count");
        Ok(())
    }

    #[test]
    fn test_namespace_falls_back_to_default() -> anyhow::Result<()> {
        let vars = env(&[
            ("TABLE_NAME", "trips"),
            ("BRANCH_NAME", "ingest"),
            ("S3_PATH", "s3://bucket/trips/"),
        ]);
        let cfg = resolve_flow_config(&WapSettings::default(), &FlowOverrides::default(), |k| {
            vars.get(k).cloned()
        })?;
        assert_eq!(cfg.namespace, "bauplan");
        Ok(())
    }

    #[test]
    fn test_flags_win_over_env() -> anyhow::Result<()> {
        let vars = env(&[
            ("TABLE_NAME", "trips"),
            ("BRANCH_NAME", "ingest"),
            ("S3_PATH", "s3://bucket/trips/"),
        ]);
        let overrides = FlowOverrides {
            branch_name: Some("backfill".into()),
            audit_column: Some("fare_amount".into()),
            ..Default::default()
        };
        let cfg = resolve_flow_config(&WapSettings::default(), &overrides, |k| {
            vars.get(k).cloned()
        })?;
        assert_eq!(cfg.branch_name, "backfill");
        assert_eq!(cfg.audit_column, "fare_amount");
        Ok(())
    }

    #[test]
    fn test_missing_variable_is_named() {
        let vars = env(&[("TABLE_NAME", "trips"), ("BRANCH_NAME", "ingest")]);
        let err = resolve_flow_config(&WapSettings::default(), &FlowOverrides::default(), |k| {
            vars.get(k).cloned()
        });
        match err {
            Err(WapError::Infrastructure(InfrastructureError::ConfigError(msg))) => {
                assert!(msg.contains("S3_PATH"))
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_main_branch_rejected() {
        let vars = env(&[
            ("TABLE_NAME", "trips"),
            ("BRANCH_NAME", "main"),
            ("S3_PATH", "s3://bucket/trips/"),
        ]);
        let err = resolve_flow_config(&WapSettings::default(), &FlowOverrides::default(), |k| {
            vars.get(k).cloned()
        });
        assert!(matches!(
            err,
            Err(WapError::Domain(DomainError::ProtectedBranch(_)))
        ));
    }
}
