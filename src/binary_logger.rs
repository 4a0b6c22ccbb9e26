//! Binary record encoder.
//!
//! Instead of rendering text, a binary record carries references: the image
//! address of the format string and tag (see [`string_registry`]), the
//! timestamp, and the raw argument values. An offline decoder holding the
//! same image ([`LogReader`]) reconstructs the line.
//!
//! # Wire format
//!
//! ```text
//! producer(1) | control(2) | format(4) | tag(4 | 2+n) | ts(4 | 8) | args... | crc8(1)
//! ```
//!
//! Every multi-byte value is sent most significant byte first. The control
//! word packs `length:10 | level:3 | ts64:1 | version:2` from the least
//! significant bit up, where `length` counts the bytes between the control
//! word and the CRC. The CRC-8 (polynomial 0x07, init 0) covers everything
//! from the producer byte on.
//!
//! A string-class value is either a 4-byte image address or, when the string
//! is not in the image, an embedded copy: a 2-byte negative prefix
//! `1 - n` followed by `n >= 2` bytes (zero padded). The sign of the first two
//! bytes tells the two apart, since image addresses start with a positive
//! half word.
//!
//! [`string_registry`]: crate::string_registry
//! [`LogReader`]: crate::log_reader::LogReader

use std::fmt::Write as _;

use crate::config::{BINARY_PROTOCOL_VERSION, MAX_BINARY_PAYLOAD, MAX_EMBEDDED_STR};
use crate::level::LogLevel;
use crate::loggable::{ArgClass, LogArg};
use crate::message::LogMessage;
use crate::printf::ArgClassifier;
use crate::sink::{ByteSink, CountingSink, CrcSink, StackBuf};
use crate::string_registry;

/// Producer id plus the packed 16-bit control word: the first three bytes of
/// every record.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlWord {
    pub producer_id: u8,
    word: u16,
}

const _: () = assert!(std::mem::size_of::<ControlWord>() == 3);

impl ControlWord {
    const LEN_MASK: u16 = 0x03FF;
    const LEVEL_SHIFT: u16 = 10;
    const TS64: u16 = 1 << 13;
    const VERSION_SHIFT: u16 = 14;

    /// Size of the control word on the wire, producer byte included.
    pub const WIRE_SIZE: usize = std::mem::size_of::<ControlWord>();

    pub fn new(producer_id: u8, len: usize, level: LogLevel, ts64: bool) -> Self {
        let mut word = (len as u16 & Self::LEN_MASK)
            | ((level as u16 & 0b111) << Self::LEVEL_SHIFT)
            | ((BINARY_PROTOCOL_VERSION as u16 & 0b11) << Self::VERSION_SHIFT);
        if ts64 {
            word |= Self::TS64;
        }
        Self { producer_id, word }
    }

    pub fn from_wire(bytes: [u8; 3]) -> Self {
        Self {
            producer_id: bytes[0],
            word: u16::from_be_bytes([bytes[1], bytes[2]]),
        }
    }

    pub fn to_wire(self) -> [u8; 3] {
        let [hi, lo] = { self.word }.to_be_bytes();
        [self.producer_id, hi, lo]
    }

    /// Bytes between the control word and the CRC.
    pub fn len(self) -> usize {
        ({ self.word } & Self::LEN_MASK) as usize
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    pub fn level(self) -> LogLevel {
        LogLevel::from_u8((({ self.word } >> Self::LEVEL_SHIFT) & 0b111) as u8)
    }

    pub fn ts64(self) -> bool {
        ({ self.word }) & Self::TS64 != 0
    }

    pub fn version(self) -> u8 {
        ({ self.word } >> Self::VERSION_SHIFT) as u8
    }
}

/// Encodes [`LogMessage`]s into binary records.
///
/// # Examples
///
/// ```
/// # use taglog::binary_logger::BinaryEncoder;
/// # use taglog::message::{LogMessage, MessageConfig};
/// # use taglog::{string_registry, LogArg, LogLevel};
/// static FMT: &str = "boot took %d ms";
/// string_registry::register_string(FMT).unwrap();
///
/// let args = [LogArg::I32(250)];
/// let msg = LogMessage {
///     config: MessageConfig::new(LogLevel::Info).with_binary(true),
///     tag: None,
///     format: FMT,
///     timestamp: 10,
///     arg_types: None,
///     args: &args,
/// };
/// let mut record = Vec::new();
/// let len = BinaryEncoder::new(1).encode(&mut record, &msg);
/// // format(4) + tag(4) + ts(4) + one int(4)
/// assert_eq!(len, Some(16));
/// assert_eq!(record.len(), 3 + 16 + 1);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BinaryEncoder {
    producer_id: u8,
}

impl BinaryEncoder {
    pub fn new(producer_id: u8) -> Self {
        Self { producer_id }
    }

    /// Writes one record to `out`.
    ///
    /// The record is walked twice: a counting pass sizes the payload for the
    /// control word, then the emitting pass streams it through the CRC.
    ///
    /// # Returns
    ///
    /// The payload length, or `None` if the record was too long for the
    /// 10-bit length field and nothing was written.
    ///
    /// # Panics
    ///
    /// When the format string is not in the image string table. Binary
    /// logging of unregistered formats is a build misconfiguration.
    pub fn encode<S: ByteSink>(&self, out: &mut S, msg: &LogMessage<'_>) -> Option<usize> {
        let format_addr = string_registry::lookup(msg.format);
        assert!(
            format_addr.is_some(),
            "binary log format is not in the image string table: {:?}",
            msg.format
        );
        let format_addr = format_addr.unwrap_or_default();
        let ts64 = msg.timestamp > u32::MAX as u64;

        let mut counter = CountingSink::default();
        encode_body(&mut counter, msg, format_addr, ts64);
        let len = counter.count;
        if len > MAX_BINARY_PAYLOAD {
            if !msg.config.constrained() {
                tracing::warn!(len, format = msg.format, "binary record too long, dropped");
            }
            return None;
        }

        let control = ControlWord::new(self.producer_id, len, msg.level(), ts64);
        let crc = {
            let mut sink = CrcSink::new(out);
            sink.put_slice(&control.to_wire());
            encode_body(&mut sink, msg, format_addr, ts64);
            sink.crc()
        };
        out.put(crc);
        Some(len)
    }
}

/// Everything between the control word and the CRC.
fn encode_body<S: ByteSink>(sink: &mut S, msg: &LogMessage<'_>, format_addr: u32, ts64: bool) {
    sink.put_slice(&format_addr.to_be_bytes());
    match msg.tag {
        Some(tag) => put_str_ref(sink, tag),
        None => sink.put_slice(&0u32.to_be_bytes()),
    }
    if ts64 {
        sink.put_slice(&msg.timestamp.to_be_bytes());
    } else {
        sink.put_slice(&(msg.timestamp as u32).to_be_bytes());
    }

    match msg.arg_types {
        Some(desc) => put_args(sink, desc.iter(), msg.args),
        None => put_args(sink, ArgClassifier::new(msg.format), msg.args),
    }
}

fn put_args<S, I>(sink: &mut S, classes: I, args: &[LogArg<'_>])
where
    S: ByteSink,
    I: Iterator<Item = ArgClass>,
{
    let mut args = args.iter();
    for class in classes {
        let arg = args.next();
        match class {
            ArgClass::Int32 => {
                let value = arg.map_or(0, |a| a.as_u64() as u32);
                sink.put_slice(&value.to_be_bytes());
            }
            ArgClass::Int64 => {
                let value = arg.map_or(0, |a| a.as_u64());
                sink.put_slice(&value.to_be_bytes());
            }
            ArgClass::Pointer => match arg {
                Some(LogArg::Str(s)) => put_str_ref(sink, s),
                Some(LogArg::Ptr(p)) => sink.put_slice(&(*p as u32).to_be_bytes()),
                Some(other) => {
                    let mut text = StackBuf::<64>::new();
                    let _ = write!(text, "{}", other);
                    put_embedded(sink, text.as_str());
                }
                None => sink.put_slice(&0u32.to_be_bytes()),
            },
        }
    }
}

fn put_str_ref<S: ByteSink>(sink: &mut S, s: &str) {
    match string_registry::lookup(s) {
        Some(addr) => sink.put_slice(&addr.to_be_bytes()),
        None => put_embedded(sink, s),
    }
}

/// Truncates at a character boundary so the decoder always sees valid UTF-8.
fn put_embedded<S: ByteSink>(sink: &mut S, s: &str) {
    let mut end = s.len().min(MAX_EMBEDDED_STR);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let bytes = &s.as_bytes()[..end];
    let n = bytes.len().max(2);
    sink.put_slice(&((1 - n as i32) as i16).to_be_bytes());
    sink.put_slice(bytes);
    for _ in bytes.len()..n {
        sink.put(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::crc8;
    use crate::message::{ArgDescriptor, MessageConfig};

    static FMT: &str = "bin %s=%d";
    static TAG: &str = "bin-tag";

    fn message<'a>(args: &'a [LogArg<'a>], timestamp: u64) -> LogMessage<'a> {
        string_registry::register_string(FMT).unwrap();
        string_registry::register_string(TAG).unwrap();
        LogMessage {
            config: MessageConfig::new(LogLevel::Warn).with_binary(true),
            tag: Some(TAG),
            format: FMT,
            timestamp,
            arg_types: None,
            args,
        }
    }

    #[test]
    fn test_control_word_layout() {
        let cw = ControlWord::new(7, 0x2AB, LogLevel::Debug, true);
        assert_eq!(cw.len(), 0x2AB);
        assert_eq!(cw.level(), LogLevel::Debug);
        assert!(cw.ts64());
        assert_eq!(cw.version(), BINARY_PROTOCOL_VERSION);
        // 01 1 100 1010101011
        assert_eq!(cw.to_wire(), [7, 0b0111_0010, 0b1010_1011]);
        assert_eq!(ControlWord::from_wire(cw.to_wire()), cw);

        let narrow = ControlWord::new(7, 5, LogLevel::Error, false);
        assert!(!narrow.ts64());
        assert_eq!(narrow.len(), 5);
        assert_eq!(narrow.level(), LogLevel::Error);
    }

    #[test]
    fn test_record_layout_and_crc() {
        let dynamic = String::from("ab");
        let args = [LogArg::Str(&dynamic), LogArg::I32(-2)];
        let msg = message(&args, 0x0102_0304);
        let mut record = Vec::new();
        let len = BinaryEncoder::new(9).encode(&mut record, &msg).unwrap();

        // format(4) tag(4) ts(4) embedded "ab"(2+2) int(4)
        assert_eq!(len, 20);
        assert_eq!(record.len(), ControlWord::WIRE_SIZE + len + 1);
        let cw = ControlWord::from_wire([record[0], record[1], record[2]]);
        assert_eq!(cw.producer_id, 9);
        assert_eq!(cw.len(), len);
        assert!(!cw.ts64());

        let format_addr = string_registry::lookup(FMT).unwrap();
        assert_eq!(&record[3..7], &format_addr.to_be_bytes());
        assert_eq!(&record[11..15], &[1, 2, 3, 4]);
        assert_eq!(&record[15..19], &[0xFF, 0xFF, b'a', b'b']);
        assert_eq!(&record[19..23], &[0xFF, 0xFF, 0xFF, 0xFE]);
        assert_eq!(*record.last().unwrap(), crc8(&record[..record.len() - 1]));
    }

    #[test]
    fn test_wide_timestamp() {
        let args = [LogArg::Str(TAG), LogArg::I32(1)];
        let msg = message(&args, u32::MAX as u64 + 1);
        let mut record = Vec::new();
        let len = BinaryEncoder::new(1).encode(&mut record, &msg).unwrap();
        // Registered string argument travels as an address.
        assert_eq!(len, 4 + 4 + 8 + 4 + 4);
        assert!(ControlWord::from_wire([record[0], record[1], record[2]]).ts64());
    }

    #[test]
    fn test_short_strings_pad_to_two() {
        let mut out = Vec::new();
        put_embedded(&mut out, "");
        assert_eq!(out, [0xFF, 0xFF, 0, 0]);
        out.clear();
        put_embedded(&mut out, "x");
        assert_eq!(out, [0xFF, 0xFF, b'x', 0]);
        out.clear();
        put_embedded(&mut out, "xyz");
        assert_eq!(out, [0xFF, 0xFE, b'x', b'y', b'z']);
    }

    #[test]
    fn test_descriptor_overrides_format() {
        let dynamic = String::from("k");
        let args = [LogArg::Str(&dynamic), LogArg::I64(5)];
        let mut msg = message(&args, 0);
        msg.arg_types = ArgDescriptor::from_args(&args);
        let mut record = Vec::new();
        let len = BinaryEncoder::new(1).encode(&mut record, &msg).unwrap();
        // "%d" would say 4 bytes, the descriptor says 8.
        assert_eq!(len, 12 + 4 + 8);
    }

    #[test]
    fn test_oversize_record_dropped() {
        let long = "x".repeat(MAX_EMBEDDED_STR);
        let args = [LogArg::Str(&long), LogArg::Str(&long), LogArg::I32(0)];
        static LONG_FMT: &str = "%s%s%d";
        string_registry::register_string(LONG_FMT).unwrap();
        let msg = LogMessage {
            format: LONG_FMT,
            ..message(&args, 0)
        };
        let mut record = Vec::new();
        assert_eq!(BinaryEncoder::new(1).encode(&mut record, &msg), None);
        assert!(record.is_empty());
    }

    #[test]
    #[should_panic(expected = "not in the image")]
    fn test_unregistered_format_panics() {
        let msg = LogMessage {
            format: "never registered %d",
            ..message(&[], 0)
        };
        let _ = BinaryEncoder::new(1).encode(&mut Vec::new(), &msg);
    }
}
