//! Logger module
//!
//! Provides logging utilities for the server including:
//! - Leveled application logging on top of `tracing`
//! - Access logging with multiple formats on the `access` target
//! - Server lifecycle logging
//! - File-based access logging support

mod format;
mod writer;

pub use format::AccessLogEntry;

use crate::config::{Config, LoggingConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{filter_fn, EnvFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt as tracing_fmt, Layer};

/// Target access records are emitted on
pub const ACCESS_TARGET: &str = "access";

/// Verbosity selected by configuration or `--log-level`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only
    #[serde(alias = "error")]
    #[value(alias = "error")]
    Err,
    /// Lifecycle messages, no access records
    Info,
    /// Lifecycle messages and one access record per request
    #[default]
    Request,
    /// Adds scriptlet loads and other per-request detail
    Verbose,
    /// Everything, including cache hits
    Debug,
}

impl LogLevel {
    /// `EnvFilter` directive for this level
    pub const fn filter_directive(self) -> &'static str {
        match self {
            Self::Err => "error",
            Self::Info => "info,access=off",
            Self::Request => "info",
            Self::Verbose => "info,rootserve=debug",
            Self::Debug => "info,rootserve=trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Err => "err",
            Self::Info => "info",
            Self::Request => "request",
            Self::Verbose => "verbose",
            Self::Debug => "debug",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("cannot open access log: {0}")]
    AccessLog(#[from] std::io::Error),

    #[error(transparent)]
    Subscriber(#[from] TryInitError),
}

/// Keeps the background access-log writer alive; flushes on drop
#[must_use = "dropping the guard stops the access log writer"]
pub struct LogGuard {
    _access: Option<WorkerGuard>,
}

/// Install the global subscriber
///
/// Should be called once at application startup. `RUST_LOG` takes precedence
/// over the configured level.
pub fn init(config: &LoggingConfig) -> Result<LogGuard, InitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.filter_directive()));
    let registry = tracing_subscriber::registry().with(filter);

    match config.access_log_file.as_deref() {
        Some(path) => {
            let (writer, guard) = writer::access_writer(path)?;
            let access = tracing_fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .without_time()
                .with_level(false)
                .with_target(false)
                .with_filter(filter_fn(|meta| meta.target() == ACCESS_TARGET));
            let app = tracing_fmt::layer()
                .with_filter(filter_fn(|meta| meta.target() != ACCESS_TARGET));
            registry.with(access).with(app).try_init()?;
            Ok(LogGuard {
                _access: Some(guard),
            })
        }
        None => {
            registry.with(tracing_fmt::layer()).try_init()?;
            Ok(LogGuard { _access: None })
        }
    }
}

static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("ANSI escape regex should be valid")
});

/// Remove terminal colour and cursor codes
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!("======================================");
    tracing::info!("rootserve started successfully");
    tracing::info!("Listening on: http://{addr}");
    tracing::info!("Log level: {}", config.logging.level);
    match config.server.workers {
        Some(workers) => tracing::info!("Worker threads: {workers}"),
        None => tracing::info!("Single-threaded event loop"),
    }
    for root in &config.mounts.roots {
        tracing::info!("Code root: {root}");
    }
    for root in &config.mounts.static_roots {
        tracing::info!("Static root: {root}");
    }
    if config.resolver.dev_mode {
        tracing::info!("Dev mode: handlers reload on every request");
    }
    if let Some(ref path) = config.logging.access_log_file {
        tracing::info!("Access log: {path}");
    }
    tracing::info!("======================================");
}

pub fn log_server_stop() {
    tracing::info!("Shutdown signal received, no longer accepting connections");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    tracing::debug!("[Connection] Accepted from: {peer_addr}");
}

pub fn log_connection_error(err: &impl fmt::Debug) {
    tracing::error!("Failed to serve connection: {err:?}");
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

pub fn log_info(message: &str) {
    tracing::info!("{message}");
}

/// Emit one formatted access record
pub fn log_request(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: ACCESS_TARGET, "{}", entry.format(format));
}

pub fn log_verbose(message: &str) {
    tracing::debug!("{message}");
}

pub fn log_debug(message: &str) {
    tracing::trace!("{message}");
}
