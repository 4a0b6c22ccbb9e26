use std::fmt;
use std::str::FromStr;

use crate::error::LogError;

/// Log verbosity, ordered from least to most verbose.
///
/// A tag configured at [`LogLevel::None`] is fully suppressed. A message at
/// level `L` passes a threshold `T` when `L != None && L <= T`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    None = 0,
    Error = 1,
    Warn = 2,
    #[default]
    Info = 3,
    Debug = 4,
    Verbose = 5,
}

impl LogLevel {
    /// Converts a raw level, saturating anything above `Verbose`.
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::None,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Verbose,
        }
    }

    /// Letter printed in front of every text line.
    pub const fn letter(self) -> u8 {
        match self {
            LogLevel::None => b' ',
            LogLevel::Error => b'E',
            LogLevel::Warn => b'W',
            LogLevel::Info => b'I',
            LogLevel::Debug => b'D',
            LogLevel::Verbose => b'V',
        }
    }

    /// ANSI color for this level, if it has one.
    pub const fn color_code(self) -> Option<&'static str> {
        match self {
            LogLevel::Error => Some("\x1b[0;31m"),
            LogLevel::Warn => Some("\x1b[0;33m"),
            LogLevel::Info => Some("\x1b[0;32m"),
            _ => None,
        }
    }

    pub const fn reset_color_code() -> &'static str {
        "\x1b[0m"
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::None => "none",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Verbose => "verbose",
        }
    }

    /// Returns true when a message at `self` passes `threshold`.
    #[inline(always)]
    pub fn passes(self, threshold: LogLevel) -> bool {
        self != LogLevel::None && self <= threshold
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" | "n" => Ok(LogLevel::None),
            "error" | "e" => Ok(LogLevel::Error),
            "warn" | "warning" | "w" => Ok(LogLevel::Warn),
            "info" | "i" => Ok(LogLevel::Info),
            "debug" | "d" => Ok(LogLevel::Debug),
            "verbose" | "trace" | "v" => Ok(LogLevel::Verbose),
            other => Err(LogError::InvalidLevel(other.to_string())),
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Info => LogLevel::Info,
            log::Level::Debug => LogLevel::Debug,
            log::Level::Trace => LogLevel::Verbose,
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::None => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Verbose => log::LevelFilter::Trace,
        }
    }
}
