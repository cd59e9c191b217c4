//! `pinpad`: door controller for a serial pinpad terminal.

mod app;
mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use crate::config::Config;
use crate::logging::LogFormat;

#[derive(Parser)]
#[command(name = "pinpad", version, about = "Pinpad door access controller")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device of the terminal
    #[arg(long)]
    device: Option<String>,

    /// URL of the remote credential list
    #[arg(long)]
    pin_url: Option<String>,

    /// Local credential file
    #[arg(long)]
    pin_path: Option<PathBuf>,

    /// Control socket path
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(device) = self.device {
            config.serial.device = device;
        }
        if let Some(url) = self.pin_url {
            config.sync.pin_url = url;
        }
        if let Some(path) = self.pin_path {
            config.sync.pin_path = path;
        }
        if let Some(socket) = self.socket {
            config.control.socket = socket;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{e:#}");
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    cli.apply(&mut config);

    if let Err(e) = logging::init(&config.logging.level, config.logging.format) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    match app::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "pinpad",
            "--device",
            "/dev/ttyUSB1",
            "--pin-url",
            "http://example.invalid/pins",
            "--pin-path",
            "/tmp/pins.json",
            "--socket",
            "/tmp/ctrl.sock",
            "--log-format",
            "json",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.serial.device, "/dev/ttyUSB1");
        assert_eq!(config.sync.pin_url, "http://example.invalid/pins");
        assert_eq!(config.sync.pin_path, PathBuf::from("/tmp/pins.json"));
        assert_eq!(config.control.socket, PathBuf::from("/tmp/ctrl.sock"));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let cli = Cli::parse_from(["pinpad"]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.serial.device, "/dev/ttyAMA0");
    }
}
