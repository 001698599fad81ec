pub mod flow;
pub mod settings;

pub use flow::{FlowOverrides, resolve_flow_config};
pub use settings::{Backend, LakehouseSettings, WapSettings, load_settings};
