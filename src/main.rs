mod config;
mod firewall;
mod models;
mod notify;
mod pipeline;
mod reporting;
mod transport;

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::settings::{LoggingConfig, Settings};
use crate::pipeline::cycle::CycleRunner;
use crate::transport::client::{HttpTransport, ReqwestTransport};
use crate::transport::sleeper::{Sleeper, TokioSleeper};

const CONFIG_PATH_ENV: &str = "WAFWATCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Config file location: `$WAFWATCH_CONFIG`, else `config.toml`.
fn config_path() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

/// Initialise the `tracing` subscriber with stdout and optional file output.
///
/// The returned guard flushes the file writer on drop and must live as long
/// as the process.
fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let stdout_layer = match config.format.as_str() {
        "json" => fmt::layer().json().with_target(true).boxed(),
        "text" => fmt::layer().with_target(true).boxed(),
        other => bail!("unknown log format '{}', expected 'text' or 'json'", other),
    };

    let (file_layer, guard) = match &config.file {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("logging.file has no file name: {}", file))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise tracing subscriber: {}", e))?;

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // reqwest negotiates TLS through rustls; an already-installed provider is fine.
    let _ = rustls::crypto::ring::default_provider().install_default();

    // ---------------------------------------------------------------
    // 1. Configuration
    // ---------------------------------------------------------------
    let config_path = config_path();
    let mut settings = Settings::load(&config_path)?;
    settings.apply_env_overrides();
    settings
        .validate()
        .with_context(|| format!("Invalid configuration in {}", config_path))?;
    let settings = Arc::new(settings);

    // ---------------------------------------------------------------
    // 2. Logging
    // ---------------------------------------------------------------
    let _log_guard = init_tracing(&settings.logging)?;

    info!("Starting wafwatch");
    info!("Config loaded from {}", config_path);

    // ---------------------------------------------------------------
    // 3. Pipeline
    // ---------------------------------------------------------------
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
    let runner = CycleRunner::new(settings.clone(), transport, sleeper);

    // ---------------------------------------------------------------
    // 4. Run until shutdown
    // ---------------------------------------------------------------
    tokio::select! {
        _ = runner.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutting down wafwatch");
        }
    }

    Ok(())
}
