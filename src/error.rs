//! Unified error type hierarchy for Sketch Deploy
//!
//! Provides structured error handling with ToolError, ConfigError and the
//! top-level DeployError that every pipeline stage is classified into.

use std::io;
use thiserror::Error;

/// External tool invocation errors.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Executable not found on PATH: {0}")]
    NotFound(String),

    #[error("'{program}' exited with {}", exit_code_label(.exit_code))]
    Execution {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("'{0}' interrupted by signal")]
    Interrupted(String),

    #[error("Empty command line")]
    EmptyCommand,

    #[error("'{program}' reported success but did not write {path}")]
    MissingOutput { program: String, path: String },

    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Configuration file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Global error type for a deployment run.
///
/// Every stage failure is converted into exactly one of these variants by the
/// orchestrator; `main` matches on it once to pick the operator message.
#[derive(Error, Debug)]
pub enum DeployError {
    /// A required binary (or the tool search directory) is absent
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Toolchain manager missing or unable to report its configuration
    #[error("Toolchain unavailable: {0}")]
    ToolchainUnavailable(#[source] ToolError),

    /// Toolchain manager output could not be interpreted
    #[error("Toolchain configuration could not be parsed: {0}")]
    ConfigParse(String),

    /// Bundling, compression or staging failed
    #[error("Asset pipeline failed: {0}")]
    AssetPipeline(String),

    #[error("Filesystem image build failed: {0}")]
    ImageBuild(#[source] ToolError),

    #[error("Firmware compilation failed: {0}")]
    Compile(#[source] ToolError),

    #[error("Flashing failed: {0}")]
    Flash(#[source] ToolError),

    /// Malformed command line input
    #[error("Invalid arguments: {0}")]
    Argument(String),

    /// Deployment settings file could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Deployment interrupted")]
    Interrupted,
}

impl DeployError {
    /// Get a user-facing error message suitable for the terminal
    pub fn user_message(&self) -> String {
        match self {
            DeployError::ToolNotFound(msg) => {
                format!("Required tool is not installed: {}", msg)
            }
            DeployError::ToolchainUnavailable(e) => format!(
                "arduino-cli is not installed or could not report its configuration ({})",
                e
            ),
            DeployError::ConfigParse(msg) => {
                format!("Could not read arduino-cli configuration: {}", msg)
            }
            DeployError::AssetPipeline(msg) => format!("Could not prepare web assets: {}", msg),
            DeployError::ImageBuild(e) => format!("Could not create SPIFFS image: {}", e),
            DeployError::Compile(e) => format!("Sketch compilation failed: {}", e),
            DeployError::Flash(e) => format!("Writing to the device failed: {}", e),
            DeployError::Argument(msg) => format!("Invalid arguments: {}", msg),
            DeployError::Config(e) => format!("Deployment settings are invalid: {}", e),
            DeployError::Interrupted => "Deployment interrupted, workspace cleaned".to_string(),
        }
    }

    /// Process exit status for this error kind
    pub fn exit_code(&self) -> u8 {
        match self {
            DeployError::Argument(_) => 2,
            DeployError::Config(_) => 3,
            DeployError::Interrupted => 130,
            _ => 1,
        }
    }

    /// Stderr captured from the failing tool, when there is one
    pub fn tool_stderr(&self) -> Option<&str> {
        match self {
            DeployError::ToolchainUnavailable(e)
            | DeployError::ImageBuild(e)
            | DeployError::Compile(e)
            | DeployError::Flash(e) => match e {
                ToolError::Execution { stderr, .. } if !stderr.trim().is_empty() => {
                    Some(stderr.as_str())
                }
                _ => None,
            },
            _ => None,
        }
    }
}

/// Top-level result type for a deployment run.
pub type Result<T> = std::result::Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_display() {
        let err = ToolError::Execution {
            program: "arduino-cli".to_string(),
            exit_code: Some(2),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "'arduino-cli' exited with exit code 2");
    }

    #[test]
    fn test_tool_error_display_signal() {
        let err = ToolError::Execution {
            program: "mkspiffs".to_string(),
            exit_code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("terminated by signal"));
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let not_found = || ToolError::NotFound("arduino-cli".to_string());
        let errors = vec![
            DeployError::ToolNotFound("mkspiffs".to_string()),
            DeployError::ToolchainUnavailable(not_found()),
            DeployError::ConfigParse("bad".to_string()),
            DeployError::AssetPipeline("bad".to_string()),
            DeployError::ImageBuild(not_found()),
            DeployError::Compile(not_found()),
            DeployError::Flash(not_found()),
            DeployError::Argument("bad".to_string()),
            DeployError::Interrupted,
        ];
        let prefixes: std::collections::HashSet<String> = errors
            .iter()
            .map(|e| e.user_message().split(':').next().unwrap_or_default().to_string())
            .collect();
        assert_eq!(prefixes.len(), errors.len());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(DeployError::Argument("x".into()).exit_code(), 2);
        assert_eq!(DeployError::Interrupted.exit_code(), 130);
        assert_eq!(DeployError::ConfigParse("x".into()).exit_code(), 1);
        let cfg = DeployError::from(ConfigError::ValidationFailed("x".into()));
        assert_eq!(cfg.exit_code(), 3);
    }

    #[test]
    fn test_tool_stderr_exposed() {
        let err = DeployError::Compile(ToolError::Execution {
            program: "arduino-cli".to_string(),
            exit_code: Some(1),
            stderr: "sketch.ino:3: error".to_string(),
        });
        assert_eq!(err.tool_stderr(), Some("sketch.ino:3: error"));
        assert_eq!(DeployError::Interrupted.tool_stderr(), None);
    }
}
