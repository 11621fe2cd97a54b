/// System module: external tool execution and interrupt handling

pub mod command;
pub mod signals;

pub use command::{CommandLine, CommandTemplate};

use crate::error::ToolError;
use std::path::Path;
use std::process::{Command, Stdio};

/// Runs external tools on behalf of the pipeline.
///
/// Each call blocks until the child exits. There are no retries: the caller
/// decides what a failure means for its stage.
pub trait ToolRunner {
    /// Run `command` with `cwd` as working directory and return its stdout.
    fn run(&self, command: &CommandLine, cwd: &Path) -> Result<Vec<u8>, ToolError>;
}

/// Default production implementation of ToolRunner backed by `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        SystemRunner
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, command: &CommandLine, cwd: &Path) -> Result<Vec<u8>, ToolError> {
        if signals::interrupted() {
            return Err(ToolError::Interrupted(command.label().to_string()));
        }

        // RESOLVE: fail early with a clean NotFound instead of a spawn error
        let executable = which::which_in(&command.program, std::env::var_os("PATH"), cwd)
            .map_err(|_| ToolError::NotFound(command.program.clone()))?;

        log::debug!("[Runner] $ {}", command);

        let output = Command::new(&executable)
            .args(&command.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ToolError::NotFound(command.program.clone())
                } else {
                    ToolError::Spawn {
                        program: command.program.clone(),
                        source: e,
                    }
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            log::debug!("[Runner] [{}] stdout:\n{}", command.label(), stdout.trim_end());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !stderr.trim().is_empty() {
            log::debug!("[Runner] [{}] stderr:\n{}", command.label(), stderr.trim_end());
        }

        if signals::interrupted() {
            return Err(ToolError::Interrupted(command.label().to_string()));
        }

        if !output.status.success() {
            return Err(ToolError::Execution {
                program: command.label().to_string(),
                exit_code: output.status.code(),
                stderr,
            });
        }

        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_executable_is_not_found() {
        let cmd = CommandTemplate::new("definitely-not-a-real-tool-4f2a --version")
            .render(&[])
            .expect("render");
        let result = SystemRunner::new().run(&cmd, Path::new("."));
        assert!(matches!(result, Err(ToolError::NotFound(_))));
    }

    #[test]
    fn test_captures_stdout() {
        let cmd = CommandTemplate::new("echo hello")
            .render(&[])
            .expect("render");
        let out = SystemRunner::new()
            .run(&cmd, Path::new("."))
            .expect("echo should succeed");
        assert_eq!(String::from_utf8_lossy(&out).trim(), "hello");
    }

    #[test]
    fn test_non_zero_exit_is_execution_error() {
        let cmd = CommandTemplate::new("false")
            .render(&[])
            .expect("render");
        match SystemRunner::new().run(&cmd, Path::new(".")) {
            Err(ToolError::Execution { exit_code, .. }) => assert_eq!(exit_code, Some(1)),
            other => panic!("expected execution error, got {:?}", other),
        }
    }

    #[test]
    fn test_runs_in_working_directory() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        std::fs::write(temp_dir.path().join("marker.txt"), "x").expect("Failed to write marker");
        let cmd = CommandTemplate::new("ls")
            .render(&[])
            .expect("render");
        let out = SystemRunner::new()
            .run(&cmd, temp_dir.path())
            .expect("ls should succeed");
        assert!(String::from_utf8_lossy(&out).contains("marker.txt"));
    }
}
