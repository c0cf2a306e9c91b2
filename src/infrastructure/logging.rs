use crate::config::UploadConfig;
use anyhow::Context;
use std::fs::{self, OpenOptions};
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "rust_file_uploader=debug,tower_http=info";

/// Installs the global subscriber: stdout plus `{logs_path}/{app_log}`.
///
/// Fails if the log directory or file cannot be created.
pub fn setup_logging(config: &UploadConfig) -> anyhow::Result<()> {
    fs::create_dir_all(&config.logs_path)
        .with_context(|| format!("log path {:?} could not be created", config.logs_path))?;

    let log_file = config.log_file();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .with_context(|| format!("log file {:?} could not be opened", log_file))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init()
        .context("tracing subscriber already installed")?;

    Ok(())
}
