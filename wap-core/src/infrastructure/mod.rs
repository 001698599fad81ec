// wap-core/src/infrastructure/mod.rs

pub mod adapters;
pub mod config;
pub mod error;
pub mod journal;

pub use adapters::{DuckDbLakehouse, HttpLakehouse};
pub use journal::FileJournal;
