pub mod alignment;
pub mod api;
pub mod cleaning;
pub mod cli;
pub mod commands;
pub mod config;
pub mod export;
pub mod jobs;
pub mod qc;
pub mod sequence_processor;
pub mod utils;

// Re-export main API
pub use api::*;
