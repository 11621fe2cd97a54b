//! Logging backend for deployment runs.
//!
//! ```text
//! log::info!(target: "parsed", ..)   log::debug!(..)  (tool output)
//!              |                            |
//!          [LogCollector] ------------------+
//!          |            |
//!          v            v
//!     stderr        <log_dir>/deploy-<ts>.log
//! (progress,        (every record at or above
//!  warnings,         the configured level)
//!  errors)
//! ```
//!
//! High-level progress goes through the `parsed` target (see [`log_parsed!`]);
//! everything else only reaches the session file unless it is a warning or an
//! error.

use chrono::{DateTime, Local};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Target used for operator-facing progress lines.
pub const PARSED_TARGET: &str = "parsed";

/// Log a high-level progress line (shown on the console and kept in the file)
#[macro_export]
macro_rules! log_parsed {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        $crate::log::info!(target: "parsed", "{}", msg);
    }}
}

/// Session log file name for a run started at `now`.
pub fn session_log_name(now: DateTime<Local>) -> String {
    format!("deploy-{}.log", now.format("%Y%m%d-%H%M%S"))
}

/// One line of the session file.
pub fn format_file_line(now: DateTime<Local>, record: &Record) -> String {
    format!(
        "[{}] [{:<5}] {}",
        now.format("%H:%M:%S%.3f"),
        record.level(),
        record.args()
    )
}

/// Unified logger writing progress to stderr and everything to a session file.
pub struct LogCollector {
    level: LevelFilter,
    file: Option<Mutex<File>>,
    log_path: Option<PathBuf>,
}

impl LogCollector {
    /// Create the log directory and open a fresh session file in it.
    pub fn new(log_dir: &Path, level: LevelFilter) -> Result<Self, String> {
        std::fs::create_dir_all(log_dir)
            .map_err(|e| format!("Failed to create logs directory: {}", e))?;

        let log_path = log_dir.join(session_log_name(Local::now()));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| format!("Failed to open {}: {}", log_path.display(), e))?;

        Ok(LogCollector {
            level,
            file: Some(Mutex::new(file)),
            log_path: Some(log_path),
        })
    }

    /// Logger without a session file.
    pub fn console_only(level: LevelFilter) -> Self {
        LogCollector {
            level,
            file: None,
            log_path: None,
        }
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Register as the global `log` backend.
    pub fn install(self) -> Result<(), SetLoggerError> {
        // Progress lines are info-level and must always get through
        let max_level = self.level.max(LevelFilter::Info);
        log::set_boxed_logger(Box::new(self)).map(|()| log::set_max_level(max_level))
    }

    fn shows_on_console(metadata: &Metadata) -> bool {
        metadata.target() == PARSED_TARGET || metadata.level() <= log::Level::Warn
    }
}

impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target() == PARSED_TARGET || metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if Self::shows_on_console(record.metadata()) {
            if record.target() == PARSED_TARGET {
                eprintln!("{}", record.args());
            } else {
                eprintln!("{}: {}", record.level(), record.args());
            }
        }

        if let Some(ref file) = self.file {
            if let Ok(mut handle) = file.lock() {
                let _ = writeln!(handle, "{}", format_file_line(Local::now(), record));
            }
        }
    }

    fn flush(&self) {
        if let Some(ref file) = self.file {
            if let Ok(mut handle) = file.lock() {
                let _ = handle.flush();
            }
        }
    }
}
