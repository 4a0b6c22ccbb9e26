//! Logging macros.
//!
//! Every macro takes a tag (`&'static str` or `Option<&'static str>`), a
//! printf-style format literal and its arguments. Without a leading
//! `logger: <expr>,` the process-wide [`global()`](crate::global) logger is
//! used.
//!
//! ```
//! use taglog::{log_info, log_warn, Logger, LoggerConfig};
//!
//! let logger = Logger::new(LoggerConfig::default());
//! log_info!(logger: &logger, "wifi", "connected to %s, rssi %d", "home", -61);
//! log_warn!("wifi", "retrying in %u ms", 500u32);
//! ```

/// Logs at an explicit [`LogLevel`](crate::LogLevel).
///
/// The format literal is bound to a `static`, so it has a single address and
/// can be placed in the image string table for binary logging.
#[macro_export]
macro_rules! log_at {
    (@config $config:expr, logger: $logger:expr, $tag:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        static FMT: &str = $fmt;
        let logger: &$crate::Logger = &$logger;
        let mut config: $crate::MessageConfig = $config;
        if logger.enabled(config.level()) {
            if (config.binary() || logger.config().binary_mode) && !logger.register_format(FMT) {
                config = config.with_binary(false);
            }
            logger.log_v(
                config,
                ::core::convert::Into::into($tag),
                FMT,
                &[$($crate::Loggable::to_log_arg(&$arg)),*],
            );
        }
    }};
    (@config $config:expr, $tag:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::log_at!(@config $config, logger: $crate::global(), $tag, $fmt $(, $arg)*)
    };
    (logger: $logger:expr, $level:expr, $tag:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::log_at!(@config $crate::MessageConfig::new($level), logger: $logger, $tag, $fmt $(, $arg)*)
    };
    ($level:expr, $tag:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::log_at!(@config $crate::MessageConfig::new($level), $tag, $fmt $(, $arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($t:tt)*) => { $crate::__log_level!($crate::LogLevel::Error, $($t)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($t:tt)*) => { $crate::__log_level!($crate::LogLevel::Warn, $($t)*) };
}

#[macro_export]
macro_rules! log_info {
    ($($t:tt)*) => { $crate::__log_level!($crate::LogLevel::Info, $($t)*) };
}

#[macro_export]
macro_rules! log_debug {
    ($($t:tt)*) => { $crate::__log_level!($crate::LogLevel::Debug, $($t)*) };
}

#[macro_export]
macro_rules! log_verbose {
    ($($t:tt)*) => { $crate::__log_level!($crate::LogLevel::Verbose, $($t)*) };
}

/// Early-boot and interrupt-safe variants: the call is marked constrained, so
/// it skips the tag registry and the stream lock.
#[macro_export]
macro_rules! early_log_error {
    ($($t:tt)*) => { $crate::__log_level!(@early $crate::LogLevel::Error, $($t)*) };
}

#[macro_export]
macro_rules! early_log_warn {
    ($($t:tt)*) => { $crate::__log_level!(@early $crate::LogLevel::Warn, $($t)*) };
}

#[macro_export]
macro_rules! early_log_info {
    ($($t:tt)*) => { $crate::__log_level!(@early $crate::LogLevel::Info, $($t)*) };
}

#[macro_export]
macro_rules! early_log_debug {
    ($($t:tt)*) => { $crate::__log_level!(@early $crate::LogLevel::Debug, $($t)*) };
}

#[macro_export]
macro_rules! early_log_verbose {
    ($($t:tt)*) => { $crate::__log_level!(@early $crate::LogLevel::Verbose, $($t)*) };
}

/// Emits a binary record regardless of the logger's mode.
///
/// Falls back to text if the format cannot be placed in the image.
#[macro_export]
macro_rules! binary_log {
    (logger: $logger:expr, $level:expr, $tag:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::log_at!(
            @config $crate::MessageConfig::new($level).with_binary(true),
            logger: $logger, $tag, $fmt $(, $arg)*
        )
    };
    ($level:expr, $tag:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::log_at!(
            @config $crate::MessageConfig::new($level).with_binary(true),
            $tag, $fmt $(, $arg)*
        )
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_level {
    (@early $level:expr, logger: $logger:expr, $($rest:tt)*) => {
        $crate::log_at!(@config $crate::MessageConfig::new($level).with_constrained(true), logger: $logger, $($rest)*)
    };
    (@early $level:expr, $($rest:tt)*) => {
        $crate::log_at!(@config $crate::MessageConfig::new($level).with_constrained(true), $($rest)*)
    };
    ($level:expr, logger: $logger:expr, $($rest:tt)*) => {
        $crate::log_at!(logger: $logger, $level, $($rest)*)
    };
    ($level:expr, $($rest:tt)*) => {
        $crate::log_at!($level, $($rest)*)
    };
}
