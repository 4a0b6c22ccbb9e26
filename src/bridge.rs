//! Process-wide logger and the [`log`] crate front end.
//!
//! Libraries that log through the `log` facade end up in the same tag
//! filtering and output path as direct callers: the record target becomes the
//! tag and the rendered message the payload.

use std::fmt::Write as _;

use lazy_static::lazy_static;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::config::LoggerConfig;
use crate::level::LogLevel;
use crate::logger::Logger;
use crate::loggable::LogArg;
use crate::message::MessageConfig;
use crate::sink::StackBuf;
use crate::string_registry;

/// Environment variable holding tag directives for the global logger.
pub const DIRECTIVES_ENV: &str = "TAGLOG";

/// Longest rendered `log` record; longer messages are cut.
const BRIDGE_LINE: usize = 256;

static PAYLOAD_FMT: &str = "%s";

lazy_static! {
    static ref GLOBAL: Logger = {
        let logger = Logger::new(LoggerConfig::default());
        match LoggerConfig::directives_from_env(DIRECTIVES_ENV) {
            Ok(directives) => {
                for (tag, level) in directives {
                    if let Err(e) = logger.set_level_dynamic(&tag, level) {
                        tracing::warn!(%tag, error = %e, "ignoring tag directive");
                    }
                }
            }
            Err(e) => tracing::warn!(var = DIRECTIVES_ENV, error = %e, "invalid tag directives"),
        }
        logger
    };
    static ref BRIDGE: LogBridge = LogBridge::new(&GLOBAL);
}

/// The process-wide logger used by the macros when no logger is given.
///
/// Built on first use with the default configuration and the tag directives
/// found in `TAGLOG`.
pub fn global() -> &'static Logger {
    &GLOBAL
}

/// Forwards `log` records to a [`Logger`].
pub struct LogBridge {
    logger: &'static Logger,
}

impl LogBridge {
    pub fn new(logger: &'static Logger) -> Self {
        logger.register_format(PAYLOAD_FMT);
        Self { logger }
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        let level = LogLevel::from(metadata.level());
        self.logger.enabled(level)
    }

    fn log(&self, record: &Record<'_>) {
        let level = LogLevel::from(record.level());
        if !self.logger.enabled(level) {
            return;
        }

        let mut line = StackBuf::<BRIDGE_LINE>::new();
        let _ = write!(line, "{}", record.args());
        let tag = string_registry::intern(record.target());
        self.logger.log_v(
            MessageConfig::new(level),
            Some(tag),
            PAYLOAD_FMT,
            &[LogArg::Str(line.as_str())],
        );
    }

    fn flush(&self) {}
}

/// Routes the `log` facade into the global logger.
///
/// The facade's maximum level follows the logger's ceiling.
pub fn init_log_bridge() -> Result<(), SetLoggerError> {
    log::set_logger(&*BRIDGE)?;
    log::set_max_level(LevelFilter::from(global().config().max_level));
    tracing::debug!("log facade bridged to the tag logger");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(global(), global()));
        assert_eq!(global().levels().default_level(), LogLevel::Info);
    }

    #[test]
    fn test_bridge_enabled_follows_ceiling() {
        let logger: &'static Logger =
            Box::leak(Box::new(Logger::new(LoggerConfig::default().with_max_level(LogLevel::Warn))));
        let bridge = LogBridge::new(logger);
        let warn = Metadata::builder().level(log::Level::Warn).target("t").build();
        let info = Metadata::builder().level(log::Level::Info).target("t").build();
        assert!(bridge.enabled(&warn));
        assert!(!bridge.enabled(&info));
    }
}
