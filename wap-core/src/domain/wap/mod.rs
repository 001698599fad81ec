// wap-core/src/domain/wap/mod.rs

pub mod audit;
pub mod config;
pub mod outcome;

pub use audit::{AuditReport, NullCheck};
pub use config::{DEFAULT_AUDIT_COLUMN, DEFAULT_MAIN_BRANCH, DEFAULT_NAMESPACE, WapConfig};
pub use outcome::FlowOutcome;
