use clap::error::ErrorKind;
use clap::Parser;
use std::process::ExitCode;

use sketch_deploy::config::loader::resolve_config;
use sketch_deploy::system::signals;
use sketch_deploy::{
    DeployError, LogCollector, PackagingMode, PipelineOrchestrator, SystemRunner,
};

/// Build the web dashboard and flash it together with the firmware.
#[derive(Parser, Debug)]
#[command(name = "sketch-deploy", version, about)]
struct Cli {
    /// Serial port of the board (e.g. /dev/ttyUSB0)
    port: String,

    /// Embed the assets in the firmware instead of a SPIFFS image
    #[arg(long, overrides_with = "no_progmem")]
    progmem: bool,

    /// Use a SPIFFS image (default)
    #[arg(long = "no-progmem", overrides_with = "progmem")]
    no_progmem: bool,
}

impl Cli {
    fn mode(&self) -> PackagingMode {
        PackagingMode::from_progmem_flag(self.progmem && !self.no_progmem)
    }
}

/// Reject ports that cannot be passed as a single argument.
fn validate_port(port: &str) -> Result<(), DeployError> {
    if port.trim().is_empty() {
        return Err(DeployError::Argument("serial port must not be empty".to_string()));
    }
    if port.contains(char::is_whitespace) {
        return Err(DeployError::Argument(format!(
            "serial port '{}' contains whitespace",
            port
        )));
    }
    Ok(())
}

fn report(error: &DeployError) {
    eprintln!("error: {}", error.user_message());
    if let Some(stderr) = error.tool_stderr() {
        eprintln!("{}", stderr.trim_end());
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let error = DeployError::Argument(e.to_string().trim().to_string());
            report(&error);
            return ExitCode::from(error.exit_code());
        }
    };

    if let Err(e) = validate_port(&cli.port) {
        report(&e);
        return ExitCode::from(e.exit_code());
    }

    let workspace = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("error: cannot determine working directory: {}", e);
            return ExitCode::from(1);
        }
    };

    let config = match resolve_config(&workspace) {
        Ok(config) => config,
        Err(e) => {
            let error = DeployError::from(e);
            report(&error);
            return ExitCode::from(error.exit_code());
        }
    };

    // LOGGING: session file when possible, console otherwise
    let level = config.level_filter();
    let collector = match LogCollector::new(&config.resolved_log_dir(), level) {
        Ok(collector) => collector,
        Err(e) => {
            eprintln!("warning: {}; logging to console only", e);
            LogCollector::console_only(level)
        }
    };
    let log_path = collector.log_path().map(|p| p.to_path_buf());
    if let Err(e) = collector.install() {
        eprintln!("warning: failed to install logger: {}", e);
    }
    if let Some(ref path) = log_path {
        log::info!("[Main] Session log: {}", path.display());
    }

    if let Err(e) = signals::install_interrupt_handlers() {
        log::warn!("[Main] Could not install signal handlers: {}", e);
    }

    let runner = SystemRunner::new();
    let run = PipelineOrchestrator::new(&config, &runner, cli.mode(), cli.port.as_str()).run();
    log::logger().flush();

    match run.result.error() {
        None => ExitCode::SUCCESS,
        Some(error) => {
            report(error);
            if let Some(ref path) = log_path {
                eprintln!("Full log: {}", path.display());
            }
            ExitCode::from(run.result.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_spiffs() {
        let cli = Cli::try_parse_from(["sketch-deploy", "/dev/ttyUSB0"]).expect("parse");
        assert_eq!(cli.port, "/dev/ttyUSB0");
        assert_eq!(cli.mode(), PackagingMode::FilesystemImage);
    }

    #[test]
    fn test_cli_progmem_flag() {
        let cli =
            Cli::try_parse_from(["sketch-deploy", "COM3", "--progmem"]).expect("parse");
        assert_eq!(cli.mode(), PackagingMode::EmbeddedHeader);
    }

    #[test]
    fn test_cli_last_flag_wins() {
        let cli = Cli::try_parse_from(["sketch-deploy", "COM3", "--progmem", "--no-progmem"])
            .expect("parse");
        assert_eq!(cli.mode(), PackagingMode::FilesystemImage);
    }

    #[test]
    fn test_cli_missing_port() {
        assert!(Cli::try_parse_from(["sketch-deploy"]).is_err());
    }

    #[test]
    fn test_validate_port() {
        assert!(validate_port("/dev/ttyUSB0").is_ok());
        assert!(matches!(validate_port(""), Err(DeployError::Argument(_))));
        assert!(matches!(
            validate_port("/dev/tty USB0"),
            Err(DeployError::Argument(_))
        ));
    }
}
