//! Logging configuration
//!
//! Constants describe the build-time shape of the logger (cache capacity, wire
//! protocol, image layout). [`LoggerConfig`] bundles the switches a [`Logger`]
//! is constructed with; they are fixed for the lifetime of that logger.
//!
//! [`Logger`]: crate::logger::Logger

use std::time::Duration;

use crate::error::LogError;
use crate::level::LogLevel;

/// Capacity of the tag level cache. `2^n - 1` keeps the heap a complete tree.
pub const TAG_CACHE_SIZE: usize = 31;

/// Ceiling of the min-heap cache generation counter (29 bits).
pub const MAX_GENERATION: u32 = (1 << 29) - 1;

/// Level applied to tags that were never configured.
pub const DEFAULT_LOG_LEVEL: LogLevel = LogLevel::Info;

/// Bounded wait used by the dispatch path when it consults the tag registry.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(10);

/// Version carried in the top two bits of the binary control word.
pub const BINARY_PROTOCOL_VERSION: u8 = 1;

/// Largest payload a binary record can declare (10-bit length field).
pub const MAX_BINARY_PAYLOAD: usize = (1 << 10) - 1;

/// Embedded strings longer than this are truncated by the binary encoder.
pub const MAX_EMBEDDED_STR: usize = 512;

/// First address of the simulated read-only image holding static strings.
pub const IMAGE_BASE: u32 = 0x3F40_0000;

/// Size of the simulated read-only image.
pub const IMAGE_SIZE: u32 = 0x0040_0000;

/// Producer identifier stamped on binary records by default.
pub const DEFAULT_PRODUCER_ID: u8 = 1;

/// Nominal cycle counter rate used to derive early timestamps.
pub const DEFAULT_CPU_FREQ_MHZ: u32 = 3_000;

/// Cache strategy for tag level lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Insertion-order ring buffer, oldest slot overwritten.
    Array,
    /// Binary min-heap keyed by recency generation.
    #[default]
    BinaryHeap,
    /// No cache: every lookup scans the registry.
    Disabled,
}

/// How timestamps are rendered in text output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampFormat {
    /// Raw milliseconds, e.g. `1234`.
    #[default]
    Milliseconds,
    /// `HH:MM:SS.mmm`
    Time,
    /// `YY-MM-DD HH:MM:SS.mmm`
    DateTime,
}

/// Construction-time configuration of a [`Logger`](crate::logger::Logger).
///
/// # Examples
///
/// ```
/// use taglog::{CachePolicy, LogLevel, LoggerConfig};
///
/// let config = LoggerConfig::default()
///     .with_max_level(LogLevel::Debug)
///     .with_cache_policy(CachePolicy::Array)
///     .with_colors(false);
/// assert_eq!(config.max_level, LogLevel::Debug);
/// ```
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Fixed ceiling; messages above it are dropped before any other work.
    pub max_level: LogLevel,
    /// Initial level for tags without an explicit setting.
    pub default_level: LogLevel,
    /// Enables the runtime master ceiling.
    pub master_level_enabled: bool,
    pub cache_policy: CachePolicy,
    pub cache_size: usize,
    /// Upper bound on distinct configured tags, `None` for unbounded.
    pub max_tags: Option<usize>,
    pub timestamps: bool,
    pub timestamp_format: TimestampFormat,
    pub colors: bool,
    /// Treat every call as running in a constrained context.
    pub always_constrained: bool,
    /// Render every record with the binary encoder.
    pub binary_mode: bool,
    pub producer_id: u8,
    pub lock_timeout: Duration,
    pub cpu_freq_mhz: u32,
    /// Whether the platform has a timestamp source at all.
    pub clock_source: bool,
    /// Verify the heap invariant on every cache access once full.
    pub check_heap: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            max_level: LogLevel::Verbose,
            default_level: DEFAULT_LOG_LEVEL,
            master_level_enabled: false,
            cache_policy: CachePolicy::default(),
            cache_size: TAG_CACHE_SIZE,
            max_tags: None,
            timestamps: true,
            timestamp_format: TimestampFormat::default(),
            colors: true,
            always_constrained: false,
            binary_mode: false,
            producer_id: DEFAULT_PRODUCER_ID,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            cpu_freq_mhz: DEFAULT_CPU_FREQ_MHZ,
            clock_source: true,
            check_heap: cfg!(debug_assertions),
        }
    }
}

impl LoggerConfig {
    pub fn with_max_level(mut self, level: LogLevel) -> Self {
        self.max_level = level;
        self
    }

    pub fn with_default_level(mut self, level: LogLevel) -> Self {
        self.default_level = level;
        self
    }

    pub fn with_master_level(mut self, enabled: bool) -> Self {
        self.master_level_enabled = enabled;
        self
    }

    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    pub fn with_max_tags(mut self, max_tags: usize) -> Self {
        self.max_tags = Some(max_tags);
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.colors = enabled;
        self
    }

    pub fn with_always_constrained(mut self, enabled: bool) -> Self {
        self.always_constrained = enabled;
        self
    }

    pub fn with_binary_mode(mut self, enabled: bool) -> Self {
        self.binary_mode = enabled;
        self
    }

    pub fn with_producer_id(mut self, id: u8) -> Self {
        self.producer_id = id;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_cpu_freq_mhz(mut self, mhz: u32) -> Self {
        self.cpu_freq_mhz = mhz.max(1);
        self
    }

    pub fn with_clock_source(mut self, available: bool) -> Self {
        self.clock_source = available;
        self
    }

    pub fn with_heap_check(mut self, enabled: bool) -> Self {
        self.check_heap = enabled;
        self
    }

    /// Reads tag directives (`"*=warn,wifi=debug"`) from an environment variable.
    ///
    /// Returns an empty list when the variable is unset.
    pub fn directives_from_env(var: &str) -> Result<Vec<(String, LogLevel)>, LogError> {
        match std::env::var(var) {
            Ok(spec) => parse_directives(&spec),
            Err(_) => Ok(Vec::new()),
        }
    }
}

/// Parses a comma separated list of `tag=level` pairs.
///
/// A bare level (no `=`) applies to the wildcard tag `*`.
pub fn parse_directives(spec: &str) -> Result<Vec<(String, LogLevel)>, LogError> {
    let mut directives = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (tag, level) = match part.split_once('=') {
            Some((tag, level)) => (tag.trim(), level),
            None => ("*", part),
        };
        if tag.is_empty() {
            return Err(LogError::InvalidDirective(part.to_string()));
        }
        directives.push((tag.to_string(), level.parse()?));
    }
    Ok(directives)
}
