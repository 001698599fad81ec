// wap-core/src/ports/mod.rs

pub mod journal;
pub mod lakehouse;

pub use journal::WorkflowJournal;
pub use lakehouse::{Lakehouse, MergeReceipt, ScanResult, TableRef};
