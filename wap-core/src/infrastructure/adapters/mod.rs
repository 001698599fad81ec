// wap-core/src/infrastructure/adapters/mod.rs

pub mod duckdb;
pub mod http;

pub use self::duckdb::DuckDbLakehouse;
pub use self::http::HttpLakehouse;

use std::sync::Arc;

use crate::infrastructure::config::settings::{Backend, LakehouseSettings};
use crate::infrastructure::error::InfrastructureError;
use crate::ports::lakehouse::Lakehouse;

/// Instantiates the adapter selected in the settings.
pub fn build_lakehouse(
    settings: &LakehouseSettings,
) -> Result<Arc<dyn Lakehouse>, InfrastructureError> {
    match settings.backend {
        Backend::Remote => {
            let url = settings.url.as_deref().ok_or_else(|| {
                InfrastructureError::ConfigError(
                    "lakehouse.url is required for the remote backend (or WAP_LAKEHOUSE_URL)"
                        .to_string(),
                )
            })?;
            let api_key = settings
                .api_key_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok());
            Ok(Arc::new(HttpLakehouse::new(
                url,
                api_key,
                settings.timeout_secs,
            )?))
        }
        Backend::DuckDB => Ok(Arc::new(DuckDbLakehouse::new(&settings.db_path)?)),
    }
}
