// wap-core/src/application/mod.rs

pub mod durable;
pub mod flow;
pub mod scheduler;
pub mod steps;

pub use durable::DurableContext;
pub use flow::{FlowOptions, FlowRequest, run_wap_flow};
pub use scheduler::Scheduler;
