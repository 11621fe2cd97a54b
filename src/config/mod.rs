//! Configuration module for deployment runs.
//!
//! Every command template, workspace path and flash constant the pipeline
//! uses lives in [`DeployConfig`]. The defaults reproduce the NodeMCU v2
//! (ESP8266, 4M1M layout) setup; any field can be overridden from JSON.
//!
//! # Module Structure
//!
//! - `loader`: Locates, reads and writes settings files
//! - `validator`: Checks geometry, flash parameters and command templates
//!
//! # Lookup Order
//!
//! 1. `<workspace>/sketch-deploy.json`
//! 2. `~/.config/sketch-deploy/settings.json`
//! 3. Built-in defaults
//!
//! `SKETCH_DEPLOY_LOG` overrides `log_level` from whichever source won.

pub mod loader;
pub mod validator;

use crate::models::PackagingMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Workspace-relative file layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Bundler output directory
    pub build_dir: PathBuf,
    /// Entry point copied over the bundler's own index
    pub public_index: PathBuf,
    /// Sketch used in SPIFFS mode
    pub sketch_dir: PathBuf,
    /// Sketch used in PROGMEM mode
    pub progmem_sketch_dir: PathBuf,
    /// Staging directory name inside the sketch
    pub data_subdir: String,
    /// Header emitted by the gzip/C-array generator
    pub header_file: PathBuf,
    /// Temporary SPIFFS image
    pub image_file: PathBuf,
    /// Where mkspiffs lives below the arduino-cli data directory
    pub tool_search_subdir: PathBuf,
    /// Substring identifying the image-builder executable
    pub tool_pattern: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        PathSettings {
            build_dir: PathBuf::from("build"),
            public_index: PathBuf::from("public/index.htm"),
            sketch_dir: PathBuf::from("esp8266"),
            progmem_sketch_dir: PathBuf::from("esp8266_progmem"),
            data_subdir: "data".to_string(),
            header_file: PathBuf::from("esp8266_progmem/web_data.h"),
            image_file: PathBuf::from("fs.out"),
            tool_search_subdir: PathBuf::from("packages/esp8266/tools/mkspiffs"),
            tool_pattern: "mkspiffs".to_string(),
        }
    }
}

/// Command templates for every external tool.
///
/// Templates are split on whitespace first and placeholders (`{name}`) are
/// substituted per argument afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandTemplates {
    pub bundler: String,
    pub header_generator: String,
    pub config_dump: String,
    pub image_builder: String,
    pub compile: String,
    pub flash_image: String,
    pub flash_firmware: String,
}

impl Default for CommandTemplates {
    fn default() -> Self {
        CommandTemplates {
            bundler: "npm run build".to_string(),
            header_generator: "python gzip-c-array/compress.py {build_dir} -c {header}".to_string(),
            config_dump: "arduino-cli config dump --format json".to_string(),
            image_builder:
                "{tool} -c {data_dir} -p {page_size} -b {block_size} -s {image_size} {image}"
                    .to_string(),
            compile: "arduino-cli compile -b {fqbn_compile} {sketch}".to_string(),
            flash_image: "python -m esptool -p {port} -b {baud} write_flash {address} {image}"
                .to_string(),
            flash_firmware: "arduino-cli upload -p {port} -b {fqbn_upload} {sketch}".to_string(),
        }
    }
}

/// SPIFFS geometry passed to mkspiffs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageGeometry {
    pub page_size: u32,
    pub block_size: u32,
    pub image_size: u32,
}

impl Default for ImageGeometry {
    fn default() -> Self {
        ImageGeometry {
            page_size: 256,
            block_size: 8192,
            image_size: 1_048_576,
        }
    }
}

/// Board and serial settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashSettings {
    pub baud: u32,
    /// SPIFFS start address, hex
    pub address: String,
    pub fqbn_compile: String,
    pub fqbn_upload: String,
}

impl Default for FlashSettings {
    fn default() -> Self {
        FlashSettings {
            baud: 115_200,
            address: "0x300000".to_string(),
            fqbn_compile: "esp8266:esp8266:nodemcuv2:mmu=4816H,eesz=4M1M".to_string(),
            fqbn_upload: "esp8266:esp8266:nodemcuv2".to_string(),
        }
    }
}

/// Complete settings for one deployment run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Root every relative path is resolved against
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    pub paths: PathSettings,
    pub commands: CommandTemplates,
    pub image: ImageGeometry,
    pub flash: FlashSettings,
    /// `error`, `warn`, `info`, `debug` or `trace`
    pub log_level: String,
    /// Session log directory; defaults to the user cache directory
    pub log_dir: Option<PathBuf>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        DeployConfig {
            workspace_dir: PathBuf::from("."),
            paths: PathSettings::default(),
            commands: CommandTemplates::default(),
            image: ImageGeometry::default(),
            flash: FlashSettings::default(),
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl DeployConfig {
    /// Defaults rooted at `workspace_dir`.
    pub fn for_workspace(workspace_dir: impl Into<PathBuf>) -> Self {
        DeployConfig {
            workspace_dir: workspace_dir.into(),
            ..DeployConfig::default()
        }
    }

    /// Resolve a workspace-relative path.
    pub fn workspace_path(&self, relative: &Path) -> PathBuf {
        self.workspace_dir.join(relative)
    }

    /// Sketch directory (workspace-relative) for the given mode.
    pub fn sketch_dir(&self, mode: PackagingMode) -> &Path {
        match mode {
            PackagingMode::FilesystemImage => &self.paths.sketch_dir,
            PackagingMode::EmbeddedHeader => &self.paths.progmem_sketch_dir,
        }
    }

    /// Staging directory (workspace-relative) for the given mode.
    pub fn staging_dir(&self, mode: PackagingMode) -> PathBuf {
        self.sketch_dir(mode).join(&self.paths.data_subdir)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.workspace_path(&self.paths.build_dir)
    }

    pub fn image_path(&self) -> PathBuf {
        self.workspace_path(&self.paths.image_file)
    }

    pub fn header_path(&self) -> PathBuf {
        self.workspace_path(&self.paths.header_file)
    }

    /// Log level parsed for the `log` crate; unknown names fall back to Info.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level
            .parse::<log::LevelFilter>()
            .unwrap_or(log::LevelFilter::Info)
    }

    /// Directory for session logs.
    pub fn resolved_log_dir(&self) -> PathBuf {
        match self.log_dir {
            Some(ref dir) => dir.clone(),
            None => dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("sketch-deploy")
                .join("logs"),
        }
    }
}
