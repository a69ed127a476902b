use std::path::PathBuf;
use std::sync::Arc;

use remora_config::ClientConfig;
use remora_model::{ModelEvents, ModelStore};
use remora_rpc::{Credentials, RpcClient, TransportOptions};
use remora_telemetry::{LogFormat, LoggingConfig, init_logging};
use tokio::signal;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::notify::{Notification, notification_channel};
use crate::poll::{CycleOutcome, PollLoop, PollSettings};

const NOTIFICATION_CAPACITY: usize = 64;

/// Startup choices made on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapOptions {
    /// YAML configuration file.
    pub config_path: Option<PathBuf>,
    /// Daemon host override.
    pub host: Option<String>,
    /// Daemon port override.
    pub port: Option<u16>,
    /// Run one poll cycle and exit.
    pub once: bool,
}

/// Load configuration and apply command-line overrides.
///
/// # Errors
///
/// Returns an error if loading fails or the overridden configuration is invalid.
pub fn resolve_config(options: &BootstrapOptions) -> AppResult<ClientConfig> {
    let mut config = remora_config::load(options.config_path.as_deref())
        .map_err(|err| AppError::config("config.load", err))?;
    if let Some(host) = &options.host {
        config.host.clone_from(host);
    }
    if let Some(port) = options.port {
        config.port = port;
    }
    config
        .validate()
        .map_err(|err| AppError::config("config.validate", err))?;
    Ok(config)
}

/// Build the daemon client described by `config`.
///
/// # Errors
///
/// Returns an error if the endpoint is malformed or the HTTP client cannot be built.
pub fn build_client(config: &ClientConfig) -> AppResult<RpcClient> {
    let endpoint = config
        .rpc_url()
        .map_err(|err| AppError::config("config.rpc_url", err))?;
    let credentials = config.username.as_ref().map(|username| Credentials {
        username: username.clone(),
        password: config.password.clone().unwrap_or_default(),
    });
    let options = TransportOptions {
        timeout: config.request_timeout(),
        credentials,
    };
    RpcClient::over_http(endpoint, options).map_err(|err| AppError::client("client.build", err))
}

/// Entry point for the Remora boot sequence.
///
/// # Errors
///
/// Returns an error if configuration or logging setup fails, or if a single
/// requested cycle does not complete.
pub async fn run_app(options: BootstrapOptions) -> AppResult<()> {
    let config = resolve_config(&options)?;
    let format = LogFormat::from_setting(config.log_format.as_deref())
        .map_err(|err| AppError::telemetry("telemetry.format", err))?;
    init_logging(&LoggingConfig {
        level: &config.log_level,
        format,
        build_sha: option_env!("REMORA_BUILD_SHA").unwrap_or("dev"),
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;

    run_client(&config, options.once).await
}

/// Poll the daemon described by `config` until interrupted, or once.
///
/// # Errors
///
/// Returns an error if the client cannot be built, the interrupt listener
/// fails, or a single requested cycle does not complete.
pub async fn run_client(config: &ClientConfig, once: bool) -> AppResult<()> {
    let client = build_client(config)?;
    info!(
        host = %config.host,
        port = config.port,
        once,
        "Remora client starting"
    );

    let store = Arc::new(Mutex::new(ModelStore::new(ModelEvents::new())));
    let (notifier, notifications) = notification_channel(NOTIFICATION_CAPACITY);
    let reporter = tokio::spawn(report_notifications(notifications));
    let mut poll = PollLoop::new(client, store, notifier, PollSettings::from_config(config));

    let result = if once {
        run_single(&mut poll).await
    } else {
        run_until_interrupted(&mut poll).await
    };

    drop(poll);
    if let Err(err) = reporter.await {
        warn!(error = %err, "notification reporter join failed");
    }
    result
}

async fn run_single(poll: &mut PollLoop) -> AppResult<()> {
    let summary = poll.run_once().await;
    summary.log();
    match summary.outcome {
        CycleOutcome::Completed => Ok(()),
        CycleOutcome::Failed { kind, .. } => Err(AppError::Poll {
            cycle: summary.cycle,
            kind: Some(kind),
        }),
        CycleOutcome::TimedOut => Err(AppError::Poll {
            cycle: summary.cycle,
            kind: None,
        }),
    }
}

async fn run_until_interrupted(poll: &mut PollLoop) -> AppResult<()> {
    let (tx, rx) = watch::channel(false);
    let interrupt = tokio::spawn(async move {
        let result = signal::ctrl_c().await;
        if result.is_ok() {
            info!("shutdown requested");
        }
        let _ = tx.send(true);
        result
    });

    poll.run(rx).await;

    match interrupt.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::io("signal.ctrl_c", err)),
        Err(err) => {
            warn!(error = %err, "interrupt listener join failed");
            Ok(())
        }
    }
}

async fn report_notifications(mut notifications: mpsc::Receiver<Notification>) {
    while let Some(notification) = notifications.recv().await {
        eprintln!("{notification}");
    }
}
