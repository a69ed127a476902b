//! Command-line entry for the `remora` binary.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use clap::Parser;

use crate::bootstrap::{BootstrapOptions, run_app};
use crate::error::AppError;

#[derive(Debug, Parser)]
#[command(
    name = "remora",
    version,
    about = "Headless client that keeps a live model of a torrent daemon"
)]
pub(crate) struct Cli {
    /// YAML configuration file.
    #[arg(long, env = "REMORA_CONFIG")]
    config: Option<PathBuf>,
    /// Daemon host, overriding the configuration.
    #[arg(long)]
    host: Option<String>,
    /// Daemon port, overriding the configuration.
    #[arg(long)]
    port: Option<u16>,
    /// Run a single poll cycle and exit.
    #[arg(long)]
    once: bool,
}

impl From<Cli> for BootstrapOptions {
    fn from(cli: Cli) -> Self {
        Self {
            config_path: cli.config,
            host: cli.host,
            port: cli.port,
            once: cli.once,
        }
    }
}

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

impl CliError {
    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl From<AppError> for CliError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Config { .. } => Self::Validation(format!("{:#}", anyhow::Error::new(err))),
            other => Self::Failure(other.into()),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Parses CLI arguments and runs the client. Returns the process exit code.
pub async fn run() -> i32 {
    execute(Cli::parse()).await
}

async fn execute(cli: Cli) -> i32 {
    match run_app(cli.into()).await {
        Ok(()) => 0,
        Err(err) => {
            let err = CliError::from(err);
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}
