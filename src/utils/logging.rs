//! Logging initialization for EchoClaw.
//!
//! Supports three formats:
//! - `pretty`: multi-line human-readable output
//! - `component`: compact `[LEVEL] target message {fields}` lines; use the
//!   [`log_component!`] macro to add a `component` field for per-subsystem filtering
//! - `json`: structured JSON lines for log aggregators
//!
//! Component names used by the engine: `connection`, `scheduler`, `gateway`,
//! `generator`.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{EchoError, Result};

/// Initialize the global tracing subscriber from config.
///
/// Falls back to `RUST_LOG` if set, otherwise uses `cfg.level`. When
/// `cfg.file` is set, events are appended to that file instead of stderr.
/// Calling this twice returns a configuration error rather than panicking.
pub fn init_logging(cfg: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.level))
        .map_err(|e| EchoError::Config(format!("Invalid log level '{}': {}", cfg.level, e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match (&cfg.format, &cfg.file) {
        (LogFormat::Json, Some(path)) => builder
            .json()
            .with_writer(Mutex::new(open_log_file(path)?))
            .try_init(),
        (LogFormat::Json, None) => builder.json().with_writer(std::io::stderr).try_init(),
        (LogFormat::Pretty, Some(path)) => builder
            .pretty()
            .with_ansi(false)
            .with_writer(Mutex::new(open_log_file(path)?))
            .try_init(),
        (LogFormat::Pretty, None) => builder.pretty().with_writer(std::io::stderr).try_init(),
        (LogFormat::Component, Some(path)) => builder
            .compact()
            .with_ansi(false)
            .with_writer(Mutex::new(open_log_file(path)?))
            .try_init(),
        (LogFormat::Component, None) => builder.compact().with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|e| EchoError::Config(format!("Failed to install logger: {}", e)))
}

fn open_log_file(path: &str) -> Result<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(EchoError::from)
}

/// Emit a component-tagged tracing event.
///
/// ```
/// # use echoclaw::log_component;
/// log_component!(info, "scheduler", "poll cycle finished");
/// log_component!(warn, "connection", "cycle failed", attempts = 2u32, max = 5u32);
/// ```
#[macro_export]
macro_rules! log_component {
    ($level:ident, $component:expr, $msg:expr) => {
        tracing::$level!(component = $component, $msg)
    };
    ($level:ident, $component:expr, $msg:expr, $($key:ident = $val:expr),+ $(,)?) => {
        tracing::$level!(component = $component, $($key = $val,)+ $msg)
    };
}
