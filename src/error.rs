use thiserror::Error;

/// Errors returned by configuration and registry operations.
///
/// Log calls themselves never fail; every failure on that path degrades to
/// "message not emitted".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogError {
    #[error("out of memory while growing the tag registry")]
    OutOfMemory,
    #[error("tag registry is full ({capacity} tags)")]
    RegistryFull { capacity: usize },
    #[error("image string table is full")]
    ImageFull,
    #[error("invalid log level `{0}`")]
    InvalidLevel(String),
    #[error("invalid directive `{0}`")]
    InvalidDirective(String),
}

/// Errors raised while decoding a binary log stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("record truncated at offset {offset}")]
    Truncated { offset: usize },
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),
    #[error("checksum mismatch: record carries {expected:#04x}, computed {actual:#04x}")]
    CrcMismatch { expected: u8, actual: u8 },
    #[error("address {0:#010x} is not in the image string table")]
    UnknownAddress(u32),
    #[error("embedded string is not valid UTF-8")]
    InvalidString,
}
