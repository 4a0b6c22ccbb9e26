//! Reader and utilities for decoding binary log streams.
//!
//! This module is the offline side of [`binary_logger`](crate::binary_logger):
//! it walks a byte stream record by record, verifies each CRC, resolves image
//! addresses back to strings and re-renders the original line.

use std::fmt;

use crate::binary_logger::ControlWord;
use crate::codec::crc8;
use crate::config::BINARY_PROTOCOL_VERSION;
use crate::error::DecodeError;
use crate::level::LogLevel;
use crate::loggable::{ArgClass, LogArg};
use crate::printf::{vformat, Piece, Pieces};
use crate::string_registry::get_string;

/// A value extracted from a binary record.
///
/// The wire carries no type information beyond width; values are typed by
/// the conversion they belong to in the format string.
#[derive(Debug, Clone, PartialEq)]
pub enum LogValue {
    /// A 32-bit value (`%d`, `%x`, `%c`, `*` widths, ...)
    Int(u32),

    /// A 64-bit integer (`%lld`, `%zu` on 64-bit hosts, ...)
    Long(u64),

    /// A double (`%f`, `%e`, `%g`, `%a`)
    Float(f64),

    /// A string, resolved from the image or embedded in the record
    Str(String),

    /// A null string reference
    Null,
}

impl LogValue {
    fn as_arg(&self) -> LogArg<'_> {
        match self {
            LogValue::Int(v) => LogArg::U32(*v),
            LogValue::Long(v) => LogArg::U64(*v),
            LogValue::Float(v) => LogArg::F64(*v),
            LogValue::Str(s) => LogArg::Str(s),
            LogValue::Null => LogArg::Ptr(0),
        }
    }
}

impl fmt::Display for LogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogValue::Int(v) => write!(f, "{}", v),
            LogValue::Long(v) => write!(f, "{}", v),
            LogValue::Float(v) => write!(f, "{}", v),
            LogValue::Str(s) => f.write_str(s),
            LogValue::Null => f.write_str("(null)"),
        }
    }
}

/// A single decoded record.
///
/// # Examples
///
/// ```
/// # use taglog::log_reader::LogReader;
/// # fn example(data: &[u8]) {
/// for entry in LogReader::new(data) {
///     match entry {
///         Ok(entry) => println!("{}", entry.format()),
///         Err(e) => eprintln!("skipping record: {}", e),
///     }
/// }
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub producer_id: u8,
    pub level: LogLevel,
    /// Milliseconds, as stamped by the producer.
    pub timestamp: u64,
    pub tag: Option<String>,
    /// The format string, resolved from the image
    pub format_string: &'static str,
    /// Extracted argument values, in call order
    pub parameters: Vec<LogValue>,
}

impl LogEntry {
    /// Renders the payload: the format string applied to the parameters.
    pub fn message(&self) -> String {
        let args: Vec<LogArg<'_>> = self.parameters.iter().map(LogValue::as_arg).collect();
        let mut out = Vec::new();
        vformat(&mut out, self.format_string, &args);
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Renders the record the way the text formatter would, without color:
    /// `L (timestamp) TAG: payload`.
    pub fn format(&self) -> String {
        let letter = self.level.letter() as char;
        match &self.tag {
            Some(tag) => format!("{} ({}) {}: {}", letter, self.timestamp, tag, self.message()),
            None => format!("{} ({}) {}", letter, self.timestamp, self.message()),
        }
    }
}

/// Iterates over the records of a binary log stream.
///
/// A record with a bad checksum or an unknown version is reported and
/// skipped using its declared length; a truncated record ends the stream.
pub struct LogReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> LogReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Offset of the next record.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Decodes the next record, `None` at the end of the stream.
    pub fn read_entry(&mut self) -> Option<Result<LogEntry, DecodeError>> {
        let start = self.pos;
        if start >= self.data.len() {
            return None;
        }

        let header = match self.data.get(start..start + ControlWord::WIRE_SIZE) {
            Some(&[producer, hi, lo]) => ControlWord::from_wire([producer, hi, lo]),
            _ => return Some(Err(self.truncated(start))),
        };
        let total = ControlWord::WIRE_SIZE + header.len() + 1;
        let Some(record) = self.data.get(start..start + total) else {
            return Some(Err(self.truncated(start)));
        };
        self.pos = start + total;

        if header.version() != BINARY_PROTOCOL_VERSION {
            return Some(Err(DecodeError::UnsupportedVersion(header.version())));
        }
        let (signed, crc) = record.split_at(total - 1);
        let actual = crc8(signed);
        if crc[0] != actual {
            return Some(Err(DecodeError::CrcMismatch {
                expected: crc[0],
                actual,
            }));
        }

        let body = &signed[ControlWord::WIRE_SIZE..];
        let mut cursor = Cursor {
            data: body,
            pos: 0,
            base: start + ControlWord::WIRE_SIZE,
        };
        Some(decode_body(&mut cursor, header))
    }

    fn truncated(&mut self, offset: usize) -> DecodeError {
        self.pos = self.data.len();
        DecodeError::Truncated { offset }
    }
}

impl Iterator for LogReader<'_> {
    type Item = Result<LogEntry, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_entry()
    }
}

fn decode_body(cursor: &mut Cursor<'_>, header: ControlWord) -> Result<LogEntry, DecodeError> {
    let format_addr = cursor.u32()?;
    let format_string = get_string(format_addr).ok_or(DecodeError::UnknownAddress(format_addr))?;
    let tag = match cursor.str_ref()? {
        LogValue::Str(tag) => Some(tag),
        _ => None,
    };
    let timestamp = if header.ts64() {
        cursor.u64()?
    } else {
        cursor.u32()? as u64
    };

    let mut parameters = Vec::new();
    for piece in Pieces::new(format_string) {
        let Piece::Spec(spec, _) = piece else {
            continue;
        };
        let is_float = matches!(spec.conv, b'f' | b'F' | b'e' | b'E' | b'g' | b'G' | b'a' | b'A');
        let [width, precision, value] = spec.arg_slots();
        for _star in [width, precision].into_iter().flatten() {
            parameters.push(LogValue::Int(cursor.u32()?));
        }
        let value = match value {
            Some(ArgClass::Int32) => LogValue::Int(cursor.u32()?),
            Some(ArgClass::Int64) if is_float => LogValue::Float(f64::from_bits(cursor.u64()?)),
            Some(ArgClass::Int64) => LogValue::Long(cursor.u64()?),
            Some(ArgClass::Pointer) => cursor.str_ref()?,
            None => continue,
        };
        parameters.push(value);
    }

    Ok(LogEntry {
        producer_id: header.producer_id,
        level: header.level(),
        timestamp,
        tag,
        format_string,
        parameters,
    })
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    /// Stream offset of `data[0]`, for error reporting.
    base: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let bytes = self
            .data
            .get(self.pos..self.pos + n)
            .ok_or(DecodeError::Truncated {
                offset: self.base + self.pos,
            })?;
        self.pos += n;
        Ok(bytes)
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(raw))
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(raw))
    }

    /// An image address or an embedded string, told apart by the sign of the
    /// leading half word.
    fn str_ref(&mut self) -> Result<LogValue, DecodeError> {
        let lead = self.data.get(self.pos..self.pos + 2).ok_or(DecodeError::Truncated {
            offset: self.base + self.pos,
        })?;
        let prefix = i16::from_be_bytes([lead[0], lead[1]]);
        if prefix < 0 {
            self.pos += 2;
            let n = (1 - prefix as i32) as usize;
            let bytes = self.take(n)?;
            // Only strings shorter than two bytes are padded.
            let end = if n == 2 {
                bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1)
            } else {
                n
            };
            let text = std::str::from_utf8(&bytes[..end]).map_err(|_| DecodeError::InvalidString)?;
            return Ok(LogValue::Str(text.to_owned()));
        }

        match self.u32()? {
            0 => Ok(LogValue::Null),
            addr => get_string(addr)
                .map(|s| LogValue::Str(s.to_owned()))
                .ok_or(DecodeError::UnknownAddress(addr)),
        }
    }
}
