use std::cell::Cell;
use std::io::Write as _;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::ReentrantMutex;

use crate::binary_logger::BinaryEncoder;
use crate::config::{parse_directives, LoggerConfig};
use crate::efficient_clock::TimestampProvider;
use crate::error::LogError;
use crate::level::LogLevel;
use crate::loggable::LogArg;
use crate::message::{ArgDescriptor, LogMessage, MessageConfig};
use crate::printf::arg_classes;
use crate::sink::{OutputBuffer, OutputFn};
use crate::string_registry;
use crate::tag_registry::TagLevels;
use crate::text_format::TextFormatter;

/// Probe for the execution context of the calling code.
///
/// A context is *constrained* when the logger must not block, allocate or
/// take the stream lock: interrupt handlers, code running before the
/// scheduler, or code running while caches are off.
pub trait ExecutionState: Send + Sync {
    fn in_isr(&self) -> bool;
    fn scheduler_running(&self) -> bool;
    fn cache_enabled(&self) -> bool;

    fn is_constrained(&self) -> bool {
        self.in_isr() || !self.scheduler_running() || !self.cache_enabled()
    }
}

thread_local! {
    static ISR_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Marks the current thread as running an interrupt handler while alive.
///
/// Guards nest; the thread leaves interrupt context when the last one drops.
pub struct IsrGuard {
    _not_send: PhantomData<*const ()>,
}

impl IsrGuard {
    pub fn enter() -> Self {
        ISR_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for IsrGuard {
    fn drop(&mut self) {
        ISR_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// [`ExecutionState`] for hosted targets.
///
/// Interrupt context is simulated per thread with [`IsrGuard`]; scheduler and
/// cache state are process-wide switches, both on by default.
#[derive(Debug)]
pub struct HostExecution {
    scheduler_running: AtomicBool,
    cache_enabled: AtomicBool,
}

impl HostExecution {
    pub fn new() -> Self {
        Self {
            scheduler_running: AtomicBool::new(true),
            cache_enabled: AtomicBool::new(true),
        }
    }

    pub fn set_scheduler_running(&self, running: bool) {
        self.scheduler_running.store(running, Ordering::Release);
    }

    pub fn set_cache_enabled(&self, enabled: bool) {
        self.cache_enabled.store(enabled, Ordering::Release);
    }
}

impl Default for HostExecution {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionState for HostExecution {
    fn in_isr(&self) -> bool {
        ISR_DEPTH.with(|depth| depth.get() > 0)
    }

    fn scheduler_running(&self) -> bool {
        self.scheduler_running.load(Ordering::Acquire)
    }

    fn cache_enabled(&self) -> bool {
        self.cache_enabled.load(Ordering::Acquire)
    }
}

/// Writes to standard output; the default sink.
pub fn stdout_sink(bytes: &[u8]) -> usize {
    match std::io::stdout().lock().write_all(bytes) {
        Ok(()) => bytes.len(),
        Err(_) => 0,
    }
}

/// Writes to standard error.
pub fn stderr_sink(bytes: &[u8]) -> usize {
    match std::io::stderr().lock().write_all(bytes) {
        Ok(()) => bytes.len(),
        Err(_) => 0,
    }
}

/// The logging dispatch core.
///
/// A `Logger` owns everything a log call needs: the tag registry, the
/// timestamp provider, the output sink and the stream lock serializing
/// output. It is `Sync`; share it by reference or through
/// [`global()`](crate::global).
///
/// # Thread Safety
///
/// Only the tag registry lock can block a log call, and the dispatch path
/// waits on it for at most [`LoggerConfig::lock_timeout`]. Calls from a
/// constrained context skip the registry and the stream lock entirely, so
/// their output may interleave with other threads.
///
/// # Examples
///
/// ```
/// use taglog::{LogArg, LogLevel, Logger, LoggerConfig, MessageConfig};
///
/// let logger = Logger::new(LoggerConfig::default().with_colors(false));
/// logger.set_level("wifi", LogLevel::Warn).unwrap();
///
/// // Suppressed: wifi is at Warn.
/// logger.log_v(MessageConfig::new(LogLevel::Info), Some("wifi"), "rssi %d", &[LogArg::I32(-70)]);
/// logger.log_v(MessageConfig::new(LogLevel::Error), Some("wifi"), "lost link", &[]);
/// ```
pub struct Logger {
    config: LoggerConfig,
    levels: TagLevels,
    clock: TimestampProvider,
    execution: Arc<dyn ExecutionState>,
    /// Current [`OutputFn`], stored as a raw pointer so it can be swapped
    /// without a lock.
    output: AtomicPtr<()>,
    stream_lock: ReentrantMutex<()>,
    master_level: AtomicU8,
    text: TextFormatter,
    binary: BinaryEncoder,
}

impl Logger {
    pub fn new(config: LoggerConfig) -> Self {
        Self::with_execution_state(config, Arc::new(HostExecution::new()))
    }

    pub fn with_execution_state(config: LoggerConfig, execution: Arc<dyn ExecutionState>) -> Self {
        Self {
            levels: TagLevels::new(&config),
            clock: if config.clock_source {
                TimestampProvider::new(config.cpu_freq_mhz)
            } else {
                TimestampProvider::without_source()
            },
            execution,
            output: AtomicPtr::new(stdout_sink as OutputFn as *mut ()),
            stream_lock: ReentrantMutex::new(()),
            master_level: AtomicU8::new(config.max_level as u8),
            text: TextFormatter::new(&config),
            binary: BinaryEncoder::new(config.producer_id),
            config,
        }
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn levels(&self) -> &TagLevels {
        &self.levels
    }

    pub fn clock(&self) -> &TimestampProvider {
        &self.clock
    }

    pub fn execution(&self) -> &dyn ExecutionState {
        &*self.execution
    }

    /// Sets the level of one tag, or of every tag with `"*"`.
    pub fn set_level<T>(&self, tag: T, level: LogLevel) -> Result<(), LogError>
    where
        T: Into<Option<&'static str>>,
    {
        self.levels.set_level(tag, level)
    }

    /// [`set_level`](Self::set_level) for a tag built at runtime.
    pub fn set_level_dynamic(&self, tag: &str, level: LogLevel) -> Result<(), LogError> {
        self.levels.set_level(string_registry::intern(tag), level)
    }

    pub fn get_level<T>(&self, tag: T) -> LogLevel
    where
        T: Into<Option<&'static str>>,
    {
        self.levels.get_level(tag)
    }

    /// Applies a directive list such as `"warn,wifi=debug"`.
    ///
    /// Directives are applied in order, so a later `*=` resets earlier tags.
    pub fn apply_directives(&self, spec: &str) -> Result<(), LogError> {
        for (tag, level) in parse_directives(spec)? {
            self.set_level_dynamic(&tag, level)?;
        }
        Ok(())
    }

    /// Runtime ceiling applied to every call when
    /// [`LoggerConfig::master_level_enabled`] is set.
    pub fn set_level_master(&self, level: LogLevel) {
        self.master_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn level_master(&self) -> LogLevel {
        LogLevel::from_u8(self.master_level.load(Ordering::Relaxed))
    }

    /// Replaces the output sink, returning the previous one.
    pub fn set_vprintf(&self, out: OutputFn) -> OutputFn {
        let prev = self.output.swap(out as *mut (), Ordering::AcqRel);
        // SAFETY: only `OutputFn` values are ever stored in `output`.
        unsafe { std::mem::transmute::<*mut (), OutputFn>(prev) }
    }

    fn output(&self) -> OutputFn {
        let ptr = self.output.load(Ordering::Acquire);
        // SAFETY: see `set_vprintf`.
        unsafe { std::mem::transmute::<*mut (), OutputFn>(ptr) }
    }

    /// Places a format string in the image string table ahead of binary
    /// encoding. Returns false when the image is full.
    pub fn register_format(&self, format: &'static str) -> bool {
        match string_registry::register_string(format) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(format, error = %e, "format string not registered");
                false
            }
        }
    }

    /// Cheap pre-check used by the macros before arguments are evaluated.
    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level.passes(self.config.max_level)
            && (!self.config.master_level_enabled || level.passes(self.level_master()))
    }

    /// Dispatches one log call.
    ///
    /// Filters by the ceilings and the tag level, stamps the time and hands
    /// the message to the text or binary formatter. Never fails: anything
    /// that prevents output just drops the message.
    pub fn log_v(&self, config: MessageConfig, tag: Option<&'static str>, format: &str, args: &[LogArg<'_>]) {
        let level = config.level();
        if !self.enabled(level) {
            return;
        }

        let constrained = config.constrained()
            || self.config.always_constrained
            || self.execution.is_constrained();
        let config = config.with_constrained(constrained);

        let timestamp = if self.config.timestamps
            && !config.timestamp_disabled()
            && self.clock.has_source()
        {
            self.clock.timestamp(constrained)
        } else {
            0
        };

        if !constrained && tag.is_some() {
            let threshold = self.levels.get_level_with_timeout(tag, self.config.lock_timeout);
            if !level.passes(threshold) {
                return;
            }
        }

        let binary = config.binary() || self.config.binary_mode;
        let msg = LogMessage {
            config: config.with_binary(binary),
            tag,
            format,
            timestamp,
            arg_types: if self.config.binary_mode {
                ArgDescriptor::from_classes(arg_classes(format))
            } else {
                None
            },
            args,
        };
        self.dispatch(&msg);
    }

    fn dispatch(&self, msg: &LogMessage<'_>) {
        let _stream = (!msg.config.constrained()).then(|| self.stream_lock.lock());
        let mut out = OutputBuffer::<128>::new(self.output());
        if msg.config.binary() {
            self.binary.encode(&mut out, msg);
        } else {
            self.text.format(&mut out, msg, &self.clock);
        }
        out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    thread_local! {
        static CAPTURED: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
    }

    fn capture(bytes: &[u8]) -> usize {
        CAPTURED.with(|c| c.borrow_mut().extend_from_slice(bytes));
        bytes.len()
    }

    fn take() -> String {
        CAPTURED.with(|c| String::from_utf8(std::mem::take(&mut *c.borrow_mut())).unwrap())
    }

    fn logger(config: LoggerConfig) -> Logger {
        let logger = Logger::new(config.with_colors(false).with_timestamps(false));
        logger.set_vprintf(capture);
        logger
    }

    #[test]
    fn test_sink_swap_returns_previous() {
        let logger = Logger::new(LoggerConfig::default());
        let prev = logger.set_vprintf(capture);
        assert_eq!(prev as usize, stdout_sink as OutputFn as usize);
        assert_eq!(logger.set_vprintf(stderr_sink) as usize, capture as OutputFn as usize);
    }

    #[test]
    fn test_tag_filtering() {
        let logger = logger(LoggerConfig::default());
        logger.set_level("net", LogLevel::Warn).unwrap();
        logger.log_v(MessageConfig::new(LogLevel::Info), Some("net"), "hidden", &[]);
        logger.log_v(MessageConfig::new(LogLevel::Warn), Some("net"), "shown %d", &[LogArg::I32(1)]);
        assert_eq!(take(), "W net: shown 1\n");
    }

    #[test]
    fn test_master_level() {
        let logger = logger(LoggerConfig::default().with_master_level(true));
        logger.set_level_master(LogLevel::Error);
        logger.log_v(MessageConfig::new(LogLevel::Warn), None, "hidden", &[]);
        assert_eq!(take(), "");
        logger.set_level_master(LogLevel::Verbose);
        logger.log_v(MessageConfig::new(LogLevel::Warn), None, "shown", &[]);
        assert_eq!(take(), "W shown\n");
    }

    #[test]
    fn test_constrained_bypasses_tag_check() {
        let logger = logger(LoggerConfig::default());
        logger.set_level("isr", LogLevel::None).unwrap();
        {
            let _isr = IsrGuard::enter();
            logger.log_v(MessageConfig::new(LogLevel::Error), Some("isr"), "from isr", &[]);
        }
        logger.log_v(MessageConfig::new(LogLevel::Error), Some("isr"), "from task", &[]);
        assert_eq!(take(), "E isr: from isr\n");
    }

    #[test]
    fn test_directives() {
        let logger = logger(LoggerConfig::default());
        logger.apply_directives("error,dyn-tag=debug").unwrap();
        assert_eq!(logger.get_level("dyn-tag"), LogLevel::Debug);
        assert_eq!(logger.get_level("other"), LogLevel::Error);
        assert!(logger.apply_directives("x=nope").is_err());
    }
}
