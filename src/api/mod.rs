pub mod service;

pub use service::JobService;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type shared by every core operation
pub type EngineResult<T> = Result<T, EngineError>;

/// Closed set of failure kinds. This is what a failed job record carries,
/// so callers polling status can still match on the kind.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineError {
    #[error("Input error: {message}")]
    Input { message: String },

    #[error("Invalid parameters: {message}")]
    Validation { message: String },

    #[error("{}", external_tool_message(.command, .exit_code, .stderr, .stage))]
    ExternalTool {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stage: Option<String>,
    },

    #[error("Empty result: {message}")]
    EmptyResult { message: String },

    #[error("Command timed out after {seconds}s: {command}")]
    Timeout { command: String, seconds: u64 },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Invalid job state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn external_tool_message(
    command: &str,
    exit_code: &Option<i32>,
    stderr: &str,
    stage: &Option<String>,
) -> String {
    let code = match exit_code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    };
    let prefix = match stage {
        Some(stage) => format!("[{}] ", stage),
        None => String::new(),
    };
    format!(
        "{}Command failed with {}.\nCMD: {}\nStderr: {}",
        prefix, code, command, stderr
    )
}

impl EngineError {
    pub fn input(message: impl Into<String>) -> Self {
        EngineError::Input {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation {
            message: message.into(),
        }
    }

    pub fn empty_result(message: impl Into<String>) -> Self {
        EngineError::EmptyResult {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        EngineError::NotFound {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::Internal {
            message: message.into(),
        }
    }

    /// Attach the stage name to an external tool failure. Other kinds pass through.
    pub fn with_stage(self, stage_name: &str) -> Self {
        match self {
            EngineError::ExternalTool {
                command,
                exit_code,
                stderr,
                ..
            } => EngineError::ExternalTool {
                command,
                exit_code,
                stderr,
                stage: Some(stage_name.to_string()),
            },
            other => other,
        }
    }

    /// Stable snake_case name of the kind, matching the serialized tag.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Input { .. } => "input",
            EngineError::Validation { .. } => "validation",
            EngineError::ExternalTool { .. } => "external_tool",
            EngineError::EmptyResult { .. } => "empty_result",
            EngineError::Timeout { .. } => "timeout",
            EngineError::NotFound { .. } => "not_found",
            EngineError::InvalidTransition { .. } => "invalid_transition",
            EngineError::Io { .. } => "io",
            EngineError::Internal { .. } => "internal",
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Io {
            message: format!("JSON error: {}", err),
        }
    }
}
