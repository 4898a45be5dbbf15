//! Tracing setup for the command-line tools
//!
//! A migration run writes three sinks: the console (stderr), a run log with
//! every event that passes the filter, and an error log with ERROR events
//! only. Both files are named after the run's start time and written through
//! non-blocking appenders whose guards live in [`RunLog`]; dropping it
//! flushes them.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use hostshift_core::config::LoggingConfig;
use hostshift_core::error::{HostshiftError, HostshiftResult};

const LOG_ENV: &str = "HOSTSHIFT_LOG";

/// Build the filter: `HOSTSHIFT_LOG`, then `RUST_LOG`, then the configured level
fn env_filter(default_level: &str, verbose: bool) -> EnvFilter {
    let fallback = if verbose { "debug" } else { default_level };

    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!(
                "invalid {} directive ({}); using {}",
                LOG_ENV, err, fallback
            );
            EnvFilter::new(fallback)
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
    }
}

/// Log sinks for one migration run
#[derive(Debug)]
pub struct RunLog {
    run_log: PathBuf,
    error_log: PathBuf,
    _guards: Vec<WorkerGuard>,
}

impl RunLog {
    /// Open the run and error logs in the configured directory and install
    /// the global subscriber
    pub fn init(config: &LoggingConfig, verbose: bool) -> HostshiftResult<Self> {
        std::fs::create_dir_all(&config.directory).map_err(|e| {
            HostshiftError::configuration(
                "logging.directory",
                format!("cannot create {}: {}", config.directory.display(), e),
            )
        })?;

        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        let run_name = format!("hostshift-run-{}.log", stamp);
        let error_name = format!("hostshift-errors-{}.log", stamp);

        let (run_writer, run_guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(&config.directory, &run_name));
        let (error_writer, error_guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(&config.directory, &error_name));

        let console_layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);

        let run_layer = fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(run_writer);

        let error_layer = fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(error_writer)
            .with_filter(LevelFilter::ERROR);

        tracing_subscriber::registry()
            .with(env_filter(&config.level, verbose))
            .with(console_layer)
            .with(run_layer)
            .with(error_layer)
            .try_init()
            .map_err(|e| HostshiftError::internal(format!("tracing already initialised: {}", e)))?;

        let run_log = config.directory.join(run_name);
        let error_log = config.directory.join(error_name);
        tracing::info!(
            run_log = %run_log.display(),
            error_log = %error_log.display(),
            "Logging initialised"
        );

        Ok(Self {
            run_log,
            error_log,
            _guards: vec![run_guard, error_guard],
        })
    }

    pub fn run_log_path(&self) -> &Path {
        &self.run_log
    }

    pub fn error_log_path(&self) -> &Path {
        &self.error_log
    }
}

/// Console-only logging for read-only tools
pub fn init_console(default_level: &str, verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(default_level, verbose))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .ok();
}
