//! Configuration types.
//!
//! Defines the library configuration struct and the enums shared with the
//! command-line layer.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::config::constants::{DEFAULT_DATA_DIR, DEFAULT_NETWORK_TIMEOUT};

/// Logging level for the application.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
}

/// Library configuration (no CLI dependencies).
///
/// Constructed programmatically or from parsed CLI arguments.
///
/// # Examples
///
/// ```no_run
/// use reality_probe::Config;
///
/// let config = Config {
///     network_timeout: std::time::Duration::from_secs(8),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Timeout for the observation TLS handshake (handshake A).
    pub network_timeout: Duration,

    /// Directory containing the GFW list, GeoIP database and keyword files.
    pub data_dir: PathBuf,

    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network_timeout: DEFAULT_NETWORK_TIMEOUT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
        }
    }
}
