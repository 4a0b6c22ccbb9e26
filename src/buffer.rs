//! Buffer dumps: hex bytes, raw characters, or a classic hexdump, one log
//! line per 16 bytes.

use crate::codec::{cvt, cvt_hex, DIGITS_LOWER};
use crate::level::LogLevel;
use crate::logger::Logger;
use crate::loggable::LogArg;
use crate::message::MessageConfig;
use crate::sink::{ByteSink, StackBuf};

/// Bytes shown per line.
pub const BYTES_PER_LINE: usize = 16;

static LINE_FMT: &str = "%s";

fn emit(logger: &Logger, level: LogLevel, tag: Option<&'static str>, line: &str) {
    let mut config = MessageConfig::new(level);
    if logger.config().binary_mode && !logger.register_format(LINE_FMT) {
        config = config.with_binary(false);
    }
    logger.log_v(config, tag, LINE_FMT, &[LogArg::Str(line)]);
}

/// Logs `buffer` as space separated hex bytes: `de ad be ef`.
pub fn log_buffer_hex(logger: &Logger, tag: Option<&'static str>, buffer: &[u8], level: LogLevel) {
    if !logger.enabled(level) {
        return;
    }
    for chunk in buffer.chunks(BYTES_PER_LINE) {
        let mut line = StackBuf::<{ BYTES_PER_LINE * 3 }>::new();
        for (i, &byte) in chunk.iter().enumerate() {
            if i > 0 {
                line.put(b' ');
            }
            put_hex_byte(&mut line, byte);
        }
        emit(logger, level, tag, line.as_str());
    }
}

/// Logs `buffer` as characters, bytes above 0x7f shown as Latin-1.
pub fn log_buffer_char(logger: &Logger, tag: Option<&'static str>, buffer: &[u8], level: LogLevel) {
    if !logger.enabled(level) {
        return;
    }
    for chunk in buffer.chunks(BYTES_PER_LINE) {
        let mut line = StackBuf::<{ BYTES_PER_LINE * 2 }>::new();
        for &byte in chunk {
            let mut utf8 = [0u8; 4];
            line.put_slice(char::from(byte).encode_utf8(&mut utf8).as_bytes());
        }
        emit(logger, level, tag, line.as_str());
    }
}

/// Logs `buffer` as a hexdump with an address column and an ASCII gutter:
///
/// ```text
/// 0x3ffb4280   45 53 50 33 32 20 69 73  20 67 72 65 61 74 2c 20  |ESP32 is great, |
/// ```
pub fn log_buffer_hexdump(logger: &Logger, tag: Option<&'static str>, buffer: &[u8], level: LogLevel) {
    if !logger.enabled(level) {
        return;
    }
    let base = buffer.as_ptr() as usize;
    for (n, chunk) in buffer.chunks(BYTES_PER_LINE).enumerate() {
        let mut line = StackBuf::<96>::new();
        format_hexdump_line(&mut line, base + n * BYTES_PER_LINE, chunk);
        emit(logger, level, tag, line.as_str());
    }
}

fn put_hex_byte<S: ByteSink>(out: &mut S, byte: u8) {
    let mut digits = [0u8; 2];
    let len = cvt_hex(byte as u64, 2, &mut digits);
    out.put_slice(&digits[..len]);
}

fn format_hexdump_line<S: ByteSink>(out: &mut S, addr: usize, chunk: &[u8]) {
    let mut digits = [0u8; 16];
    let len = cvt(addr as u64, 16, 8, DIGITS_LOWER, &mut digits);
    out.put_slice(b"0x");
    out.put_slice(&digits[..len]);
    out.put_slice(b"  ");

    for i in 0..BYTES_PER_LINE {
        if i == BYTES_PER_LINE / 2 {
            out.put(b' ');
        }
        out.put(b' ');
        match chunk.get(i) {
            Some(&byte) => put_hex_byte(out, byte),
            None => out.put_slice(b"  "),
        }
    }

    out.put_slice(b"  |");
    for &byte in chunk {
        out.put(if byte.is_ascii_graphic() || byte == b' ' { byte } else { b'.' });
    }
    out.put(b'|');
}
