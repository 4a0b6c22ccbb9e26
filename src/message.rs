//! Per-call message record.

use crate::level::LogLevel;
use crate::loggable::{ArgClass, LogArg};

/// Packed per-call options ("config bits").
///
/// | bits | meaning |
/// |------|---------|
/// | 0–2  | level |
/// | 3    | call site runs in a constrained context |
/// | 4    | wrap the payload in level/timestamp/tag prefix and newline |
/// | 5    | color disabled |
/// | 6    | timestamp disabled |
/// | 7    | binary mode |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageConfig(u32);

impl MessageConfig {
    const LEVEL_MASK: u32 = 0b111;
    const CONSTRAINED: u32 = 1 << 3;
    const REQUIRE_FORMATTING: u32 = 1 << 4;
    const DIS_COLOR: u32 = 1 << 5;
    const DIS_TIMESTAMP: u32 = 1 << 6;
    const BINARY: u32 = 1 << 7;

    /// A formatted message at `level`; everything else off.
    pub const fn new(level: LogLevel) -> Self {
        Self(level as u32 | Self::REQUIRE_FORMATTING)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn level(self) -> LogLevel {
        LogLevel::from_u8((self.0 & Self::LEVEL_MASK) as u8)
    }

    pub const fn constrained(self) -> bool {
        self.0 & Self::CONSTRAINED != 0
    }

    pub const fn require_formatting(self) -> bool {
        self.0 & Self::REQUIRE_FORMATTING != 0
    }

    pub const fn color_disabled(self) -> bool {
        self.0 & Self::DIS_COLOR != 0
    }

    pub const fn timestamp_disabled(self) -> bool {
        self.0 & Self::DIS_TIMESTAMP != 0
    }

    pub const fn binary(self) -> bool {
        self.0 & Self::BINARY != 0
    }

    const fn with(self, flag: u32, on: bool) -> Self {
        if on {
            Self(self.0 | flag)
        } else {
            Self(self.0 & !flag)
        }
    }

    pub const fn with_constrained(self, on: bool) -> Self {
        self.with(Self::CONSTRAINED, on)
    }

    pub const fn with_formatting(self, on: bool) -> Self {
        self.with(Self::REQUIRE_FORMATTING, on)
    }

    pub const fn without_color(self) -> Self {
        self.with(Self::DIS_COLOR, true)
    }

    pub const fn without_timestamp(self) -> Self {
        self.with(Self::DIS_TIMESTAMP, true)
    }

    pub const fn with_binary(self, on: bool) -> Self {
        self.with(Self::BINARY, on)
    }
}

/// Compact argument-type list: two bits per argument, four per byte, least
/// significant pair first, terminated by a zero pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgDescriptor {
    packed: [u8; ArgDescriptor::BYTES],
}

impl ArgDescriptor {
    const BYTES: usize = 8;
    /// One pair is reserved for the terminator.
    pub const MAX_ARGS: usize = Self::BYTES * 4 - 1;

    /// Builds the descriptor from the arguments' own classes.
    ///
    /// Returns `None` when there are more than [`Self::MAX_ARGS`] arguments.
    pub fn from_args(args: &[LogArg<'_>]) -> Option<Self> {
        Self::from_classes(args.iter().map(LogArg::class))
    }

    pub fn from_classes(classes: impl IntoIterator<Item = ArgClass>) -> Option<Self> {
        let mut packed = [0u8; Self::BYTES];
        for (i, class) in classes.into_iter().enumerate() {
            if i >= Self::MAX_ARGS {
                return None;
            }
            packed[i / 4] |= class.code() << ((i % 4) * 2);
        }
        Some(Self { packed })
    }

    /// Raw packed bytes, including the zero terminator.
    pub fn as_bytes(&self) -> &[u8] {
        let used = self.iter().count() / 4 + 1;
        &self.packed[..used.min(Self::BYTES)]
    }

    pub fn iter(&self) -> impl Iterator<Item = ArgClass> + '_ {
        (0..Self::BYTES * 4)
            .map(move |i| ArgClass::from_code(self.packed[i / 4] >> ((i % 4) * 2)))
            .take_while(Option::is_some)
            .flatten()
    }
}

/// A log call after the level gate: built on the stack, consumed by exactly
/// one formatter, never stored.
#[derive(Debug, Clone, Copy)]
pub struct LogMessage<'a> {
    pub config: MessageConfig,
    pub tag: Option<&'static str>,
    pub format: &'a str,
    pub timestamp: u64,
    pub arg_types: Option<ArgDescriptor>,
    pub args: &'a [LogArg<'a>],
}

impl LogMessage<'_> {
    pub fn level(&self) -> LogLevel {
        self.config.level()
    }
}
