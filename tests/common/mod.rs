//! Shared fixtures: a scratch workspace, a fake toolchain install and a
//! scripted tool runner that imitates npm, arduino-cli, mkspiffs and esptool.

#![allow(dead_code)]

use sketch_deploy::{CommandLine, DeployConfig, ToolError, ToolRunner};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Which external tool a command line stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Bundle,
    Header,
    ConfigDump,
    Image,
    Compile,
    FlashImage,
    FlashFirmware,
}

pub fn classify(command: &CommandLine) -> Stage {
    let first = command.args.first().map(String::as_str).unwrap_or_default();
    match (command.program.as_str(), first) {
        ("npm", _) => Stage::Bundle,
        ("python", "-m") => Stage::FlashImage,
        ("python", _) => Stage::Header,
        ("arduino-cli", "config") => Stage::ConfigDump,
        ("arduino-cli", "compile") => Stage::Compile,
        ("arduino-cli", "upload") => Stage::FlashFirmware,
        (program, _) if program.ends_with("mkspiffs") => Stage::Image,
        (program, _) => panic!("unexpected program {}", program),
    }
}

/// How a scripted stage should misbehave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Exit with status 1 and some stderr
    Exit,
    /// Report an interrupted child
    Interrupt,
    /// Succeed without producing any output file
    NoOutput,
}

/// Temp workspace plus a toolchain data directory holding mkspiffs.
pub struct Fixture {
    pub workspace: TempDir,
    pub toolchain: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let workspace = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir_all(workspace.path().join("public")).expect("mkdir public");
        fs::write(workspace.path().join("public/index.htm"), "<html></html>")
            .expect("write index");
        fs::create_dir_all(workspace.path().join("esp8266")).expect("mkdir sketch");
        fs::create_dir_all(workspace.path().join("esp8266_progmem")).expect("mkdir sketch");

        let toolchain = TempDir::new().expect("Failed to create temp directory");
        let tool_dir = toolchain
            .path()
            .join("packages/esp8266/tools/mkspiffs/3.1.0");
        fs::create_dir_all(&tool_dir).expect("mkdir tool");
        fs::write(tool_dir.join("mkspiffs"), "#!/bin/sh\n").expect("write tool");

        Fixture {
            workspace,
            toolchain,
        }
    }

    pub fn root(&self) -> &Path {
        self.workspace.path()
    }

    pub fn config(&self) -> DeployConfig {
        DeployConfig::for_workspace(self.workspace.path())
    }

    pub fn runner(&self, build_files: &[(&str, &str)]) -> ScriptedRunner {
        ScriptedRunner {
            data_dir: self.toolchain.path().to_path_buf(),
            build_files: build_files
                .iter()
                .map(|(name, body)| (name.to_string(), body.to_string()))
                .collect(),
            fault: None,
            calls: RefCell::new(Vec::new()),
            staged_at_image_build: RefCell::new(None),
        }
    }
}

/// Plays back plausible tool behaviour and records every call.
pub struct ScriptedRunner {
    data_dir: PathBuf,
    build_files: Vec<(String, String)>,
    fault: Option<(Stage, Fault)>,
    pub calls: RefCell<Vec<CommandLine>>,
    /// Files under `esp8266/data` when mkspiffs ran
    pub staged_at_image_build: RefCell<Option<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn failing(mut self, stage: Stage, fault: Fault) -> Self {
        self.fault = Some((stage, fault));
        self
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.calls.borrow().iter().map(classify).collect()
    }

    pub fn call(&self, stage: Stage) -> Option<CommandLine> {
        self.calls
            .borrow()
            .iter()
            .find(|command| classify(command) == stage)
            .cloned()
    }
}

impl ToolRunner for ScriptedRunner {
    fn run(&self, command: &CommandLine, cwd: &Path) -> Result<Vec<u8>, ToolError> {
        self.calls.borrow_mut().push(command.clone());
        let stage = classify(command);

        let fault = match self.fault {
            Some((failing, fault)) if failing == stage => Some(fault),
            _ => None,
        };
        match fault {
            Some(Fault::Exit) => {
                return Err(ToolError::Execution {
                    program: command.label().to_string(),
                    exit_code: Some(1),
                    stderr: format!("{:?} failed", stage),
                })
            }
            Some(Fault::Interrupt) => {
                return Err(ToolError::Interrupted(command.label().to_string()))
            }
            Some(Fault::NoOutput) => return Ok(Vec::new()),
            None => {}
        }

        match stage {
            Stage::Bundle => {
                let build = cwd.join("build");
                fs::create_dir_all(&build).expect("mkdir build");
                for (name, body) in &self.build_files {
                    let path = build.join(name);
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent).expect("mkdir build subdir");
                    }
                    fs::write(path, body).expect("write build file");
                }
                Ok(Vec::new())
            }
            Stage::Header => {
                // compress.py <build_dir> -c <header>
                let header = command.args.last().expect("header argument");
                fs::write(cwd.join(header), "const char web_data[] PROGMEM = {};\n")
                    .expect("write header");
                Ok(Vec::new())
            }
            Stage::ConfigDump => {
                let dump = serde_json::json!({
                    "directories": {
                        "data": self.data_dir,
                        "user": "/home/dev/Arduino",
                    }
                });
                Ok(dump.to_string().into_bytes())
            }
            Stage::Image => {
                let data_dir = &command.args[1];
                let mut staged: Vec<String> = fs::read_dir(cwd.join(data_dir))
                    .expect("staging dir exists")
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .collect();
                staged.sort();
                *self.staged_at_image_build.borrow_mut() = Some(staged);

                let image = command.args.last().expect("image argument");
                fs::write(cwd.join(image), b"SPIFFS").expect("write image");
                Ok(Vec::new())
            }
            Stage::Compile | Stage::FlashImage | Stage::FlashFirmware => Ok(Vec::new()),
        }
    }
}
