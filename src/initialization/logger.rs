//! Logger initialization.

use std::io::Write;

use colored::Colorize;
use log::LevelFilter;

use crate::error_handling::InitializationError;

/// Initializes the logger with the specified level.
///
/// Reads `RUST_LOG` first, then applies the CLI-provided level on top, so
/// `RUST_LOG=debug` works for quick debugging while `--log-level` keeps
/// explicit control. Uses `try_init()` so repeated initialization (tests)
/// does not panic.
pub fn init_logger_with(level: LevelFilter) -> Result<(), InitializationError> {
    let mut builder = env_logger::Builder::from_default_env();

    builder.filter_level(level);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("rustls", LevelFilter::Info);
    // hickory warns about malformed UDP DNS messages it already handles.
    builder.filter_module("hickory_proto", LevelFilter::Error);
    builder.filter_module("reality_probe", level);

    builder.format(|buf, record| {
        let level = record.level();
        let colored_level = match level {
            log::Level::Error => level.to_string().red(),
            log::Level::Warn => level.to_string().yellow(),
            log::Level::Info => level.to_string().green(),
            log::Level::Debug => level.to_string().blue(),
            log::Level::Trace => level.to_string().purple(),
        };
        writeln!(buf, "[{}] {}", colored_level, record.args())
    });

    builder.try_init().map_err(InitializationError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_does_not_panic_when_reinitialized() {
        let _ = env_logger::try_init();
        let first = init_logger_with(LevelFilter::Info);
        let second = init_logger_with(LevelFilter::Debug);
        // One of the calls may fail because a logger is already installed;
        // neither may panic.
        assert!(first.is_ok() || first.is_err());
        assert!(second.is_ok() || second.is_err());
    }
}
