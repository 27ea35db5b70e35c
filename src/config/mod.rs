pub mod config;

pub use config::{AlignmentConfig, EngineConfig, ToolsConfig};
