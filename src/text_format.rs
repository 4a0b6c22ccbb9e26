//! Human-readable rendering: `[color]L (timestamp) TAG: payload[reset]\n`.

use crate::config::{LoggerConfig, TimestampFormat};
use crate::efficient_clock::TimestampProvider;
use crate::level::LogLevel;
use crate::message::LogMessage;
use crate::printf::vformat;
use crate::sink::ByteSink;

/// Renders [`LogMessage`]s as text lines.
#[derive(Debug, Clone, Copy)]
pub struct TextFormatter {
    colors: bool,
    timestamps: bool,
    timestamp_format: TimestampFormat,
}

impl TextFormatter {
    pub fn new(config: &LoggerConfig) -> Self {
        Self {
            colors: config.colors,
            timestamps: config.timestamps,
            timestamp_format: config.timestamp_format,
        }
    }

    /// Writes one message to `out`.
    ///
    /// Without the require-formatting flag only the rendered payload is
    /// written: no prefix, no color, no newline.
    pub fn format<S: ByteSink>(&self, out: &mut S, msg: &LogMessage<'_>, clock: &TimestampProvider) {
        let config = msg.config;
        if !config.require_formatting() {
            vformat(out, msg.format, msg.args);
            return;
        }

        let level = msg.level();
        let color = if self.colors && !config.color_disabled() {
            level.color_code()
        } else {
            None
        };

        if let Some(color) = color {
            out.put_slice(color.as_bytes());
        }
        out.put(level.letter());
        out.put(b' ');

        if self.timestamps && !config.timestamp_disabled() && clock.has_source() {
            let mut ts = [0u8; 32];
            let len = clock.timestamp_str(self.timestamp_format, config.constrained(), msg.timestamp, &mut ts);
            out.put(b'(');
            out.put_slice(&ts[..len]);
            out.put_slice(b") ");
        }

        if let Some(tag) = msg.tag {
            out.put_slice(tag.as_bytes());
            out.put_slice(b": ");
        }

        vformat(out, msg.format, msg.args);

        if color.is_some() {
            out.put_slice(LogLevel::reset_color_code().as_bytes());
        }
        out.put(b'\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loggable::LogArg;
    use crate::message::MessageConfig;

    fn render(config: &LoggerConfig, msg: &LogMessage<'_>) -> String {
        let clock = TimestampProvider::new(1_000);
        let mut out = Vec::new();
        TextFormatter::new(config).format(&mut out, msg, &clock);
        String::from_utf8(out).unwrap()
    }

    fn message<'a>(config: MessageConfig, tag: Option<&'static str>, format: &'a str, args: &'a [LogArg<'a>]) -> LogMessage<'a> {
        LogMessage {
            config,
            tag,
            format,
            timestamp: 1234,
            arg_types: None,
            args,
        }
    }

    #[test]
    fn test_colored_line() {
        let args = [LogArg::I32(7)];
        let msg = message(MessageConfig::new(LogLevel::Error), Some("net"), "down %d", &args);
        assert_eq!(
            render(&LoggerConfig::default(), &msg),
            "\x1b[0;31mE (1234) net: down 7\x1b[0m\n"
        );
    }

    #[test]
    fn test_debug_has_no_color() {
        let msg = message(MessageConfig::new(LogLevel::Debug), Some("net"), "x", &[]);
        assert_eq!(render(&LoggerConfig::default(), &msg), "D (1234) net: x\n");
    }

    #[test]
    fn test_color_and_timestamp_switches() {
        let msg = message(MessageConfig::new(LogLevel::Info).without_timestamp(), None, "hello", &[]);
        let config = LoggerConfig::default().with_colors(false);
        assert_eq!(render(&config, &msg), "I hello\n");

        let msg = message(MessageConfig::new(LogLevel::Warn).without_color(), Some("t"), "w", &[]);
        assert_eq!(render(&LoggerConfig::default().with_timestamps(false), &msg), "W t: w\n");
    }

    #[test]
    fn test_raw_payload_without_formatting() {
        let args = [LogArg::Str("raw")];
        let msg = message(MessageConfig::new(LogLevel::Info).with_formatting(false), Some("t"), "%s", &args);
        assert_eq!(render(&LoggerConfig::default(), &msg), "raw");
    }

    #[test]
    fn test_time_format() {
        let msg = message(MessageConfig::new(LogLevel::Info).without_color(), Some("t"), "m", &[]);
        let config = LoggerConfig::default().with_timestamp_format(TimestampFormat::Time);
        assert_eq!(render(&config, &msg), "I (00:00:01.234) t: m\n");
    }
}
