// wap-core/src/domain/wap/config.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use validator::{Validate, ValidationError};

use crate::domain::error::DomainError;
use crate::ports::lakehouse::TableRef;

pub const DEFAULT_MAIN_BRANCH: &str = "main";
pub const DEFAULT_NAMESPACE: &str = "bauplan";
pub const DEFAULT_AUDIT_COLUMN: &str = "passenger_count";

fn re_identifier() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap_or_else(|_| {
            // Should never happen with a static pattern
            Regex::new("$^").unwrap_or_else(|_| unreachable!())
        })
    })
}

fn re_branch() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.\-]*$")
            .unwrap_or_else(|_| Regex::new("$^").unwrap_or_else(|_| unreachable!()))
    })
}

/// Inputs of one WAP run. Read at invocation time, stored with the run so a
/// resumed workflow replays with the exact same parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct WapConfig {
    #[validate(custom(function = "validate_identifier"))]
    pub table_name: String,

    #[validate(custom(function = "validate_branch_name"))]
    pub branch_name: String,

    #[validate(length(min = 1, message = "Source URI cannot be empty"))]
    pub source_uri: String,

    #[validate(custom(function = "validate_identifier"))]
    pub namespace: String,

    #[validate(custom(function = "validate_branch_name"))]
    #[serde(default = "default_main_branch")]
    pub main_branch: String,

    #[validate(custom(function = "validate_identifier"))]
    #[serde(default = "default_audit_column")]
    pub audit_column: String,
}

impl WapConfig {
    pub fn new(
        table_name: impl Into<String>,
        branch_name: impl Into<String>,
        source_uri: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            branch_name: branch_name.into(),
            source_uri: source_uri.into(),
            namespace: namespace.into(),
            main_branch: default_main_branch(),
            audit_column: default_audit_column(),
        }
    }

    pub fn with_main_branch(mut self, main_branch: impl Into<String>) -> Self {
        self.main_branch = main_branch.into();
        self
    }

    pub fn with_audit_column(mut self, column: impl Into<String>) -> Self {
        self.audit_column = column.into();
        self
    }

    pub fn table(&self) -> TableRef {
        TableRef::new(&self.namespace, &self.table_name)
    }

    /// Syntax checks first, then the one rule that protects the lakehouse:
    /// the ephemeral branch gets deleted, so it can never be the main line.
    pub fn ensure_valid(&self) -> Result<(), DomainError> {
        self.validate()
            .map_err(|e| DomainError::InvalidConfig(e.to_string()))?;

        if self.branch_name.eq_ignore_ascii_case(&self.main_branch) {
            return Err(DomainError::ProtectedBranch(self.branch_name.clone()));
        }
        Ok(())
    }
}

fn default_main_branch() -> String {
    DEFAULT_MAIN_BRANCH.to_string()
}

fn default_audit_column() -> String {
    DEFAULT_AUDIT_COLUMN.to_string()
}

fn validate_identifier(value: &str) -> Result<(), ValidationError> {
    if re_identifier().is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("identifier")
            .with_message(format!("'{}' is not a valid identifier", value).into()))
    }
}

fn validate_branch_name(value: &str) -> Result<(), ValidationError> {
    if re_branch().is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("branch")
            .with_message(format!("'{}' is not a valid branch name", value).into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trips() -> WapConfig {
        WapConfig::new("trips", "ingest-2024", "s3://bucket/trips/", "bauplan")
    }

    #[test]
    fn test_defaults_applied() {
        let cfg = trips();
        assert_eq!(cfg.main_branch, "main");
        assert_eq!(cfg.audit_column, "passenger_count");
        assert_eq!(cfg.table().fq_name(), "bauplan.trips");
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(trips().ensure_valid().is_ok());

        let user_branch = WapConfig::new("trips", "jacopo.wap_2024", "s3://b/", "taxi");
        assert!(user_branch.ensure_valid().is_ok());
    }

    #[test]
    fn test_main_branch_is_protected() {
        let cfg = WapConfig::new("trips", "main", "s3://bucket/trips/", "bauplan");
        assert!(matches!(
            cfg.ensure_valid(),
            Err(DomainError::ProtectedBranch(b)) if b == "main"
        ));

        // Local branch names ignore case, "MAIN" would be the main line
        let upper = WapConfig::new("trips", "MAIN", "s3://bucket/trips/", "bauplan");
        assert!(matches!(
            upper.ensure_valid(),
            Err(DomainError::ProtectedBranch(b)) if b == "MAIN"
        ));
    }

    #[test]
    fn test_invalid_identifiers_rejected() {
        let bad_table = WapConfig::new("trips; DROP", "ingest", "s3://b/", "bauplan");
        assert!(matches!(
            bad_table.ensure_valid(),
            Err(DomainError::InvalidConfig(_))
        ));

        let bad_branch = WapConfig::new("trips", "feature/x", "s3://b/", "bauplan");
        assert!(bad_branch.ensure_valid().is_err());

        let empty_source = WapConfig::new("trips", "ingest", "", "bauplan");
        assert!(empty_source.ensure_valid().is_err());

        let bad_column = trips().with_audit_column("passenger count");
        assert!(bad_column.ensure_valid().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() -> anyhow::Result<()> {
        let cfg: WapConfig = serde_json::from_str(
            r#"{"table_name":"trips","branch_name":"b","source_uri":"s3://x/","namespace":"ns"}"#,
        )?;
        assert_eq!(cfg.main_branch, "main");
        assert_eq!(cfg.audit_column, "passenger_count");
        Ok(())
    }
}
