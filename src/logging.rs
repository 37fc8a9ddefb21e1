//! # Logging Setup
//!
//! The HAL logs through the `log` facade. Applications that have no logger
//! of their own can install `env_logger` here; verbosity is then controlled
//! with `RUST_LOG` (for example `RUST_LOG=periph_hal=debug`).

use log::{debug, error, info, log_enabled, warn, Level, LevelFilter};

/// Initializes the logger with the `env_logger` crate.
///
/// Safe to call more than once; only the first call installs the logger.
pub fn init_logger() {
    if env_logger::Builder::from_default_env().try_init().is_err() {
        debug!("Logger already initialized");
    }
}

/// Initializes `env_logger` with a fixed level, ignoring `RUST_LOG`.
pub fn init_logger_with_level(level: LevelFilter) {
    if env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_millis()
        .try_init()
        .is_err()
    {
        debug!("Logger already initialized");
    }
}

/// Logs an error message.
pub fn log_error(message: &str) {
    if log_enabled!(Level::Error) {
        error!("{message}");
    }
}

/// Logs a warning message.
pub fn log_warn(message: &str) {
    if log_enabled!(Level::Warn) {
        warn!("{message}");
    }
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

/// Logs a debug message.
pub fn log_debug(message: &str) {
    if log_enabled!(Level::Debug) {
        debug!("{message}");
    }
}
