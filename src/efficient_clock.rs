#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::_rdtsc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Datelike, Timelike};

use crate::codec::cvt_dec;
use crate::config::TimestampFormat;

/// Millisecond timestamps for log records.
///
/// The provider has two states. While *early* (no tick clock yet, e.g. before
/// the scheduler starts) timestamps are derived from the CPU cycle counter and
/// truncated to 32 bits, so they wrap after roughly 49 days of uptime. Once
/// *ready*, timestamps come from a monotonic clock and keep all 64 bits.
///
/// A "critical" request always takes the early path: it never touches the
/// tick clock and is safe from interrupt context. Both paths count from the
/// provider's creation, and [`mark_ready`](Self::mark_ready) re-measures the
/// counter rate so they keep agreeing afterwards.
///
/// # Examples
///
/// ```
/// # use taglog::efficient_clock::TimestampProvider;
/// let clock = TimestampProvider::new(3_000);
/// assert!(!clock.is_ready());
/// clock.mark_ready();
/// let a = clock.timestamp(false);
/// let b = clock.timestamp(false);
/// assert!(b >= a);
/// ```
pub struct TimestampProvider {
    start: Instant,
    cycle_base: u64,
    ready: AtomicBool,
    cycles_per_ms: AtomicU64,
    source: bool,
    /// Wall clock minus uptime, in ms. `i64::MIN` when unset.
    wall_offset_ms: AtomicI64,
}

const WALL_UNSET: i64 = i64::MIN;

impl TimestampProvider {
    /// Creates a provider in the early state.
    ///
    /// `cpu_freq_mhz` is the rate of the cycle counter used by early
    /// timestamps. Platforms without a cycle counter count nanoseconds and
    /// ignore it.
    pub fn new(cpu_freq_mhz: u32) -> Self {
        Self {
            start: Instant::now(),
            cycle_base: cycle_count(),
            ready: AtomicBool::new(false),
            cycles_per_ms: AtomicU64::new(cycles_per_ms(cpu_freq_mhz)),
            source: true,
            wall_offset_ms: AtomicI64::new(WALL_UNSET),
        }
    }

    /// A provider for a platform with no timestamp source. Records carry 0.
    pub fn without_source() -> Self {
        Self {
            source: false,
            ..Self::new(1)
        }
    }

    pub fn has_source(&self) -> bool {
        self.source
    }

    /// Switches to the normal (tick clock) state.
    ///
    /// When at least a millisecond has passed since creation, the cycle rate
    /// is measured against the tick clock and replaces the configured one.
    pub fn mark_ready(&self) {
        let elapsed_ns = self.start.elapsed().as_nanos();
        let cycles = cycle_count().wrapping_sub(self.cycle_base) as u128;
        if elapsed_ns >= 1_000_000 {
            let measured = (cycles * 1_000_000 / elapsed_ns) as u64;
            if measured > 0 {
                self.cycles_per_ms.store(measured, Ordering::Relaxed);
            }
        }
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Returns the timestamp for a log record.
    #[inline]
    pub fn timestamp(&self, critical: bool) -> u64 {
        if critical || !self.is_ready() {
            self.early_timestamp() as u64
        } else {
            self.uptime_ms()
        }
    }

    /// Cycle-counter based milliseconds since creation, allowed to wrap.
    #[inline]
    pub fn early_timestamp(&self) -> u32 {
        let cycles = cycle_count().wrapping_sub(self.cycle_base);
        (cycles / self.cycles_per_ms.load(Ordering::Relaxed)) as u32
    }

    /// Milliseconds since this provider was created.
    pub fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Anchors uptime to calendar time, `epoch_ms` being "now".
    pub fn set_wall_clock(&self, epoch_ms: i64) {
        let offset = epoch_ms - self.uptime_ms() as i64;
        self.wall_offset_ms.store(offset, Ordering::Release);
    }

    fn wall_offset(&self) -> Option<i64> {
        match self.wall_offset_ms.load(Ordering::Acquire) {
            WALL_UNSET => None,
            offset => Some(offset),
        }
    }

    /// Renders `timestamp_ms` into `buf`, returning the number of bytes used.
    ///
    /// `Time` and `DateTime` use the wall clock when one was set and the call
    /// is not critical; otherwise uptime is rendered as if counted from the
    /// Unix epoch (`70-01-01 00:00:00.000`). `buf` should hold at least 24
    /// bytes.
    pub fn timestamp_str(
        &self,
        format: TimestampFormat,
        critical: bool,
        timestamp_ms: u64,
        buf: &mut [u8],
    ) -> usize {
        if format == TimestampFormat::Milliseconds {
            return cvt_dec(timestamp_ms, 0, buf);
        }
        let epoch_ms = match self.wall_offset() {
            Some(offset) if !critical => (timestamp_ms as i64).saturating_add(offset),
            _ => timestamp_ms as i64,
        };
        render_calendar(format, epoch_ms, buf)
    }
}

fn render_calendar(format: TimestampFormat, epoch_ms: i64, buf: &mut [u8]) -> usize {
    let Some(when) = DateTime::from_timestamp_millis(epoch_ms) else {
        return cvt_dec(epoch_ms.max(0) as u64, 0, buf);
    };

    let mut pos = 0;
    let mut push = |val: u64, pad: usize, sep: Option<u8>, buf: &mut [u8]| {
        pos += cvt_dec(val, pad, &mut buf[pos..]);
        if let Some(sep) = sep {
            if pos < buf.len() {
                buf[pos] = sep;
                pos += 1;
            }
        }
    };

    if format == TimestampFormat::DateTime {
        push((when.year().rem_euclid(100)) as u64, 2, Some(b'-'), buf);
        push(when.month() as u64, 2, Some(b'-'), buf);
        push(when.day() as u64, 2, Some(b' '), buf);
    }
    push(when.hour() as u64, 2, Some(b':'), buf);
    push(when.minute() as u64, 2, Some(b':'), buf);
    push(when.second() as u64, 2, Some(b'.'), buf);
    push(epoch_ms.rem_euclid(1000) as u64, 3, None, buf);
    pos
}

fn cycles_per_ms(cpu_freq_mhz: u32) -> u64 {
    if cfg!(any(target_arch = "x86_64", target_arch = "aarch64")) {
        cpu_freq_mhz.max(1) as u64 * 1_000
    } else {
        // Fallback counter ticks in nanoseconds.
        1_000_000
    }
}

/// Returns the raw CPU cycle counter.
///
/// This function uses architecture-specific instructions when available:
/// - x86_64: RDTSC instruction (CPU time stamp counter)
/// - aarch64: CNTVCT_EL0 register (ARM virtual counter)
/// - Other platforms: System time with nanosecond precision
#[inline(always)]
pub fn cycle_count() -> u64 {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        _rdtsc()
    }

    #[cfg(target_arch = "aarch64")]
    unsafe {
        let mut value: u64;
        std::arch::asm!("mrs {}, cntvct_el0", out(reg) value);
        value
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}
