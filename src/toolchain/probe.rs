//! arduino-cli configuration probe.

use crate::error::{DeployError, ToolError};
use crate::system::{CommandLine, ToolRunner};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Configuration reported by `arduino-cli config dump --format json`.
///
/// Read once per run and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolchainConfig {
    raw: Value,
}

impl ToolchainConfig {
    /// Parse the JSON dump.
    ///
    /// Newer arduino-cli releases nest everything under a top-level `config`
    /// key; both layouts are accepted.
    pub fn from_json(output: &[u8]) -> Result<Self, DeployError> {
        let raw: Value = serde_json::from_slice(output)
            .map_err(|e| DeployError::ConfigParse(format!("output is not valid JSON: {}", e)))?;

        if !raw.is_object() {
            return Err(DeployError::ConfigParse(
                "expected a JSON object at the top level".to_string(),
            ));
        }

        let config = ToolchainConfig { raw };
        // Fail here rather than later in the locator
        config.data_dir()?;
        Ok(config)
    }

    /// Look up a dotted key such as `directories.data`.
    pub fn get(&self, dotted_key: &str) -> Option<&Value> {
        lookup(&self.raw, dotted_key).or_else(|| {
            self.raw
                .get("config")
                .and_then(|nested| lookup(nested, dotted_key))
        })
    }

    /// The toolchain's data directory (`directories.data`).
    pub fn data_dir(&self) -> Result<PathBuf, DeployError> {
        match self.get("directories.data") {
            Some(Value::String(dir)) if !dir.trim().is_empty() => Ok(PathBuf::from(dir)),
            Some(other) => Err(DeployError::ConfigParse(format!(
                "directories.data is not a path: {}",
                other
            ))),
            None => Err(DeployError::ConfigParse(
                "directories.data missing from configuration".to_string(),
            )),
        }
    }
}

fn lookup<'v>(root: &'v Value, dotted_key: &str) -> Option<&'v Value> {
    dotted_key
        .split('.')
        .try_fold(root, |node, segment| node.get(segment))
}

/// Ask the toolchain manager for its configuration.
///
/// A missing binary or non-zero exit is `ToolchainUnavailable`; unreadable
/// output is `ConfigParse`. No retries.
pub fn get_toolchain_config(
    runner: &dyn ToolRunner,
    command: &CommandLine,
    cwd: &Path,
) -> Result<ToolchainConfig, DeployError> {
    let output = runner.run(command, cwd).map_err(|e| match e {
        ToolError::Interrupted(_) => DeployError::Interrupted,
        other => DeployError::ToolchainUnavailable(other),
    })?;

    ToolchainConfig::from_json(&output)
}
