//! Sketch Deploy
//!
//! Build-and-flash pipeline for an ESP8266 web dashboard: bundles the web
//! frontend, packages it either as a SPIFFS filesystem image or as a PROGMEM
//! header, compiles the Arduino sketch and writes everything to the board.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Packaging mode, image and tool path types
//! - **config**: Deployment settings (paths, command templates, board constants)
//! - **system**: External tool execution and interrupt handling
//! - **toolchain**: arduino-cli configuration probe and mkspiffs discovery
//! - **assets**: Web asset bundling, compression and staging
//! - **orchestrator**: Pipeline sequencing, phase tracking and cleanup
//! - **log_collector**: Console and session-file logging backend

// Core foundational modules
pub mod error;
pub mod models;

pub mod config;
pub mod system;
pub mod toolchain;
pub mod assets;

// Console + session file logging
pub mod log_collector;

pub mod orchestrator;

// Re-export the log crate for macro usage
pub use log;

pub use log_collector::LogCollector;

// Re-export error types for easy access
pub use error::{ConfigError, DeployError, Result, ToolError};

pub use models::{FilesystemImage, ImageOrigin, PackagingMode, ToolBinaryPath};

pub use config::DeployConfig;
pub use orchestrator::{PipelineOrchestrator, PipelinePhase, PipelineResult, PipelineRun};
pub use system::{CommandLine, SystemRunner, ToolRunner};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
