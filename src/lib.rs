//! # taglog
//!
//! A tag-filtered logging core for firmware-style applications.
//!
//! Every log call carries a level and a tag. The logger decides whether the
//! message is emitted, stamps it with a millisecond timestamp and renders it
//! either as a text line or as a compact binary record:
//!
//! * **Per-tag levels**: a registry maps tags to levels, fronted by a small
//!   bounded cache (ring buffer or recency min-heap) so repeated lookups skip
//!   string comparison.
//! * **Constrained contexts**: calls from interrupt handlers, before the
//!   scheduler runs or with caches off never block and never allocate.
//! * **Binary records**: format strings and tags travel as image addresses,
//!   arguments as raw values, each record closed by a CRC-8. [`LogReader`]
//!   turns a captured stream back into lines.
//!
//! ## Main Components
//!
//! * [`Logger`]: dispatch core owning the registry, clock and output sink
//! * [`tag_registry`] and [`cache`]: per-tag level lookup
//! * [`text_format`] and [`printf`]: text rendering
//! * [`binary_logger`] and [`log_reader`]: binary wire encoder and decoder
//! * [`string_registry`]: the image string table
//! * [`efficient_clock`]: early and normal timestamps
//!
//! ## Quick Start
//!
//! ```
//! use taglog::{log_error, log_info, LogLevel, Logger, LoggerConfig};
//!
//! let logger = Logger::new(LoggerConfig::default().with_colors(false));
//! logger.set_level("*", LogLevel::Warn).unwrap();
//! logger.set_level("net", LogLevel::Info).unwrap();
//!
//! log_info!(logger: &logger, "net", "link up, %d Mbps", 100);   // printed
//! log_info!(logger: &logger, "disk", "mounted %s", "/data");    // suppressed
//! log_error!(logger: &logger, "disk", "read failed: %d", -5);   // printed
//! ```

#[macro_use]
mod macros;

pub mod binary_logger;
pub mod bridge;
pub mod buffer;
pub mod cache;
pub mod codec;
pub mod config;
pub mod efficient_clock;
pub mod error;
pub mod level;
pub mod log_reader;
pub mod loggable;
pub mod logger;
pub mod message;
pub mod printf;
pub mod sink;
pub mod string_registry;
pub mod tag_registry;
pub mod text_format;

pub use binary_logger::{BinaryEncoder, ControlWord};
pub use bridge::{global, init_log_bridge, LogBridge};
pub use buffer::{log_buffer_char, log_buffer_hex, log_buffer_hexdump};
pub use config::{CachePolicy, LoggerConfig, TimestampFormat};
pub use efficient_clock::TimestampProvider;
pub use error::{DecodeError, LogError};
pub use level::LogLevel;
pub use log_reader::{LogEntry, LogReader, LogValue};
pub use loggable::{ArgClass, LogArg, Loggable};
pub use logger::{ExecutionState, HostExecution, IsrGuard, Logger};
pub use message::{ArgDescriptor, LogMessage, MessageConfig};
pub use sink::OutputFn;
pub use string_registry::{get_string, intern, register_string};
