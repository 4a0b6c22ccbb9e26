//! printf-style format strings.
//!
//! [`Pieces`] splits a format string into literal runs and conversion
//! specifications using a small state machine (flags, width, precision,
//! length, conversion). The same parse drives two consumers:
//!
//! * [`arg_classes`] maps each consumed argument to an [`ArgClass`] the way
//!   the platform's variadic calling convention would; the binary encoder and
//!   decoder use it when no explicit argument descriptor is available.
//! * [`vformat`] renders the format with a [`LogArg`] slice into a
//!   [`ByteSink`], without allocating.

use std::fmt::Write as _;

use crate::codec::{cvt, cvt_dec, DIGITS_LOWER, DIGITS_UPPER};
use crate::loggable::{ArgClass, LogArg};
use crate::sink::{ByteSink, StackBuf};

const DEFAULT_FLOAT_PRECISION: usize = 6;
/// Caps widths and precisions parsed from a format string.
const MAX_FIELD: usize = 4096;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub left: bool,
    pub plus: bool,
    pub space: bool,
    pub alt: bool,
    pub zero: bool,
}

/// Width or precision: a literal number or `*` (taken from the arguments).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    Fixed(usize),
    Star,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Length {
    #[default]
    Default,
    Char,
    Short,
    Long,
    LongLong,
    IntMax,
    Size,
    PtrDiff,
    LongDouble,
}

/// One parsed conversion specification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Spec {
    pub flags: Flags,
    pub width: Option<Count>,
    pub precision: Option<Count>,
    pub length: Length,
    /// Conversion character, `0` when the format ended mid-specification.
    pub conv: u8,
}

fn c_long_class() -> ArgClass {
    if std::mem::size_of::<std::ffi::c_long>() > 4 {
        ArgClass::Int64
    } else {
        ArgClass::Int32
    }
}

impl Spec {
    /// Class of the value argument this conversion consumes, `None` for
    /// unknown conversions (printed literally, consume nothing).
    pub fn class(&self) -> Option<ArgClass> {
        match self.conv {
            b'd' | b'i' | b'u' | b'o' | b'x' | b'X' | b'c' => Some(match self.length {
                Length::LongLong | Length::IntMax | Length::LongDouble => ArgClass::Int64,
                Length::Long => c_long_class(),
                Length::Size | Length::PtrDiff => ArgClass::pointer_width(),
                Length::Default | Length::Char | Length::Short => ArgClass::Int32,
            }),
            b'f' | b'F' | b'e' | b'E' | b'g' | b'G' | b'a' | b'A' => Some(ArgClass::Int64),
            b's' => Some(ArgClass::Pointer),
            b'p' | b'n' => Some(ArgClass::pointer_width()),
            _ => None,
        }
    }

    /// Every argument this conversion consumes, in order: `*` width, `*`
    /// precision, then the value.
    pub fn arg_slots(&self) -> [Option<ArgClass>; 3] {
        let Some(value) = self.class() else {
            return [None; 3];
        };
        let star = |c: Option<Count>| (c == Some(Count::Star)).then_some(ArgClass::Int32);
        [star(self.width), star(self.precision), Some(value)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece<'f> {
    Literal(&'f [u8]),
    /// A specification and its raw text (`%` through the conversion).
    Spec(Spec, &'f [u8]),
}

#[derive(Clone, Copy)]
enum State {
    Flags,
    Width,
    Precision,
    PrecisionValue,
    Length,
}

/// Parses the specification starting right after a `%` at `pos`.
/// Returns the spec and the index just past it.
fn parse_spec(fmt: &[u8], mut pos: usize) -> (Spec, usize) {
    let mut spec = Spec::default();
    let mut state = State::Flags;

    while pos < fmt.len() {
        let c = fmt[pos];
        match state {
            State::Flags => match c {
                b'-' => spec.flags.left = true,
                b'+' => spec.flags.plus = true,
                b' ' => spec.flags.space = true,
                b'#' => spec.flags.alt = true,
                b'0' => spec.flags.zero = true,
                _ => {
                    state = State::Width;
                    continue;
                }
            },
            State::Width => match c {
                b'*' => {
                    spec.width = Some(Count::Star);
                    state = State::Precision;
                }
                b'0'..=b'9' => {
                    let prev = match spec.width {
                        Some(Count::Fixed(n)) => n,
                        _ => 0,
                    };
                    spec.width = Some(Count::Fixed((prev * 10 + (c - b'0') as usize).min(MAX_FIELD)));
                }
                _ => {
                    state = State::Precision;
                    continue;
                }
            },
            State::Precision => {
                if c == b'.' {
                    spec.precision = Some(Count::Fixed(0));
                    state = State::PrecisionValue;
                } else {
                    state = State::Length;
                    continue;
                }
            }
            State::PrecisionValue => match c {
                b'*' => {
                    spec.precision = Some(Count::Star);
                    state = State::Length;
                }
                b'0'..=b'9' => {
                    let prev = match spec.precision {
                        Some(Count::Fixed(n)) => n,
                        _ => 0,
                    };
                    spec.precision =
                        Some(Count::Fixed((prev * 10 + (c - b'0') as usize).min(MAX_FIELD)));
                }
                _ => {
                    state = State::Length;
                    continue;
                }
            },
            State::Length => {
                spec.length = match (c, spec.length) {
                    (b'h', Length::Short) => Length::Char,
                    (b'h', _) => Length::Short,
                    (b'l', Length::Long) => Length::LongLong,
                    (b'l', _) => Length::Long,
                    (b'q', _) => Length::LongLong,
                    (b'j', _) => Length::IntMax,
                    (b'z', _) => Length::Size,
                    (b't', _) => Length::PtrDiff,
                    (b'L', _) => Length::LongDouble,
                    _ => {
                        spec.conv = c;
                        return (spec, pos + 1);
                    }
                };
            }
        }
        pos += 1;
    }
    (spec, fmt.len())
}

/// Iterator over the literal runs and specifications of a format string.
pub struct Pieces<'f> {
    fmt: &'f [u8],
    pos: usize,
}

impl<'f> Pieces<'f> {
    pub fn new(fmt: &'f str) -> Self {
        Self {
            fmt: fmt.as_bytes(),
            pos: 0,
        }
    }
}

impl<'f> Iterator for Pieces<'f> {
    type Item = Piece<'f>;

    fn next(&mut self) -> Option<Piece<'f>> {
        let fmt = self.fmt;
        let start = self.pos;
        if start >= fmt.len() {
            return None;
        }

        if fmt[start] != b'%' {
            let end = fmt[start..]
                .iter()
                .position(|&b| b == b'%')
                .map_or(fmt.len(), |off| start + off);
            self.pos = end;
            return Some(Piece::Literal(&fmt[start..end]));
        }

        match fmt.get(start + 1) {
            None => {
                self.pos = fmt.len();
                Some(Piece::Literal(&fmt[start..]))
            }
            Some(b'%') => {
                self.pos = start + 2;
                Some(Piece::Literal(&fmt[start + 1..start + 2]))
            }
            Some(_) => {
                let (spec, end) = parse_spec(fmt, start + 1);
                self.pos = end;
                Some(Piece::Spec(spec, &fmt[start..end]))
            }
        }
    }
}

/// Walks a format string and yields the class of every argument it
/// consumes, in call order.
pub struct ArgClassifier<'f> {
    pieces: Pieces<'f>,
    pending: [Option<ArgClass>; 3],
    next_slot: usize,
}

impl<'f> ArgClassifier<'f> {
    pub fn new(fmt: &'f str) -> Self {
        Self {
            pieces: Pieces::new(fmt),
            pending: [None; 3],
            next_slot: 3,
        }
    }
}

impl Iterator for ArgClassifier<'_> {
    type Item = ArgClass;

    fn next(&mut self) -> Option<ArgClass> {
        loop {
            while self.next_slot < self.pending.len() {
                let slot = self.pending[self.next_slot];
                self.next_slot += 1;
                if slot.is_some() {
                    return slot;
                }
            }
            match self.pieces.next()? {
                Piece::Spec(spec, _) => {
                    self.pending = spec.arg_slots();
                    self.next_slot = 0;
                }
                Piece::Literal(_) => {}
            }
        }
    }
}

/// Classes of the arguments `fmt` consumes, in call order.
///
/// # Examples
///
/// ```
/// # use taglog::printf::arg_classes;
/// # use taglog::ArgClass;
/// let classes: Vec<_> = arg_classes("%s took %*d ms (%lld total, %.2f%%)").collect();
/// assert_eq!(
///     classes,
///     [ArgClass::Pointer, ArgClass::Int32, ArgClass::Int32, ArgClass::Int64, ArgClass::Int64]
/// );
/// ```
pub fn arg_classes(fmt: &str) -> ArgClassifier<'_> {
    ArgClassifier::new(fmt)
}

/// Renders `fmt` with `args` into `out`, returning the number of bytes
/// produced.
///
/// Missing arguments render as zero (or `(null)` for `%s`); surplus arguments
/// are ignored.
pub fn vformat<S: ByteSink + ?Sized>(out: &mut S, fmt: &str, args: &[LogArg<'_>]) -> usize {
    let mut renderer = Renderer { out, count: 0 };
    let mut args = args.iter();
    for piece in Pieces::new(fmt) {
        match piece {
            Piece::Literal(bytes) => renderer.emit(bytes),
            Piece::Spec(spec, raw) => renderer.render(&spec, raw, &mut args),
        }
    }
    renderer.count
}

struct Renderer<'o, S: ByteSink + ?Sized> {
    out: &'o mut S,
    count: usize,
}

impl<S: ByteSink + ?Sized> Renderer<'_, S> {
    fn emit(&mut self, bytes: &[u8]) {
        self.out.put_slice(bytes);
        self.count += bytes.len();
    }

    fn fill(&mut self, byte: u8, n: usize) {
        for _ in 0..n {
            self.out.put(byte);
        }
        self.count += n;
    }

    fn field(&mut self, left: bool, zero_pad: bool, width: usize, prefix: &[u8], body: &[u8]) {
        let pad = width.saturating_sub(prefix.len() + body.len());
        if left {
            self.emit(prefix);
            self.emit(body);
            self.fill(b' ', pad);
        } else if zero_pad {
            self.emit(prefix);
            self.fill(b'0', pad);
            self.emit(body);
        } else {
            self.fill(b' ', pad);
            self.emit(prefix);
            self.emit(body);
        }
    }

    fn render(&mut self, spec: &Spec, raw: &[u8], args: &mut std::slice::Iter<'_, LogArg<'_>>) {
        if spec.class().is_none() {
            self.emit(raw);
            return;
        }

        let mut left = spec.flags.left;
        let width = match spec.width {
            Some(Count::Fixed(w)) => w,
            Some(Count::Star) => {
                let w = args.next().map_or(0, |a| a.as_i64() as i32);
                if w < 0 {
                    left = true;
                }
                (w.unsigned_abs() as usize).min(MAX_FIELD)
            }
            None => 0,
        };
        let precision = match spec.precision {
            Some(Count::Fixed(p)) => Some(p),
            Some(Count::Star) => {
                let p = args.next().map_or(0, |a| a.as_i64() as i32);
                (p >= 0).then_some((p as usize).min(MAX_FIELD))
            }
            None => None,
        };
        let arg = args.next();

        match spec.conv {
            b'd' | b'i' | b'u' | b'o' | b'x' | b'X' => {
                self.render_int(spec, left, width, precision, arg)
            }
            b'c' => {
                let c = match arg {
                    Some(LogArg::Char(c)) => *c,
                    Some(other) => char::from(other.as_u64() as u8),
                    None => '\0',
                };
                let mut utf8 = [0u8; 4];
                let body = c.encode_utf8(&mut utf8).as_bytes();
                self.field(left, false, width, b"", body);
            }
            b's' => self.render_str(left, width, precision, arg),
            b'p' => {
                let value = arg.map_or(0, |a| a.as_u64());
                let mut digits = [0u8; 16];
                let n = cvt(value, 16, 0, DIGITS_LOWER, &mut digits);
                self.field(left, false, width, b"0x", &digits[..n]);
            }
            b'n' => {}
            _ => {
                let value = arg.map_or(0.0, |a| a.as_f64());
                self.render_float(spec, left, width, precision, value);
            }
        }
    }

    fn render_int(
        &mut self,
        spec: &Spec,
        left: bool,
        width: usize,
        precision: Option<usize>,
        arg: Option<&LogArg<'_>>,
    ) {
        let bits = int_bits(spec.length, arg);
        let raw = arg.map_or(0, |a| a.as_u64());
        let signed = matches!(spec.conv, b'd' | b'i');
        let (negative, magnitude) = if signed {
            let shift = 64 - bits;
            let value = ((raw << shift) as i64) >> shift;
            (value < 0, value.unsigned_abs())
        } else if bits == 64 {
            (false, raw)
        } else {
            (false, raw & ((1u64 << bits) - 1))
        };

        let (radix, digits) = match spec.conv {
            b'o' => (8, DIGITS_LOWER),
            b'x' => (16, DIGITS_LOWER),
            b'X' => (16, DIGITS_UPPER),
            _ => (10, DIGITS_LOWER),
        };
        let mut body = [0u8; 128];
        let mut len = if precision == Some(0) && magnitude == 0 {
            0
        } else {
            cvt(magnitude, radix, precision.unwrap_or(0), digits, &mut body)
        };

        let mut prefix = StackBuf::<3>::new();
        if negative {
            prefix.put(b'-');
        } else if spec.flags.plus && signed {
            prefix.put(b'+');
        } else if spec.flags.space && signed {
            prefix.put(b' ');
        }
        if spec.flags.alt {
            match spec.conv {
                b'o' if len < body.len() && (len == 0 || body[0] != b'0') => {
                    body.copy_within(0..len, 1);
                    body[0] = b'0';
                    len += 1;
                }
                b'x' if magnitude != 0 => prefix.put_slice(b"0x"),
                b'X' if magnitude != 0 => prefix.put_slice(b"0X"),
                _ => {}
            }
        }

        let zero_pad = spec.flags.zero && !left && precision.is_none();
        self.field(left, zero_pad, width, prefix.as_bytes(), &body[..len]);
    }

    fn render_str(
        &mut self,
        left: bool,
        width: usize,
        precision: Option<usize>,
        arg: Option<&LogArg<'_>>,
    ) {
        let mut scratch = StackBuf::<64>::new();
        let text: &str = match arg {
            Some(LogArg::Str(s)) => *s,
            None | Some(LogArg::Ptr(0)) => "(null)",
            Some(other) => {
                let _ = write!(scratch, "{}", other);
                scratch.as_str()
            }
        };
        let mut end = precision.map_or(text.len(), |p| p.min(text.len()));
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        self.field(left, false, width, b"", &text.as_bytes()[..end]);
    }

    fn render_float(
        &mut self,
        spec: &Spec,
        left: bool,
        width: usize,
        precision: Option<usize>,
        value: f64,
    ) {
        let upper = spec.conv.is_ascii_uppercase();
        let precision = precision.unwrap_or(DEFAULT_FLOAT_PRECISION).min(64);
        let magnitude = value.abs();
        let mut body = StackBuf::<128>::new();

        if magnitude.is_nan() || magnitude.is_infinite() {
            let text: &[u8] = match (magnitude.is_nan(), upper) {
                (true, false) => b"nan",
                (true, true) => b"NAN",
                (false, false) => b"inf",
                (false, true) => b"INF",
            };
            body.put_slice(text);
        } else {
            match spec.conv.to_ascii_lowercase() {
                b'f' => {
                    let _ = write!(body, "{:.*}", precision, magnitude);
                    if spec.flags.alt && precision == 0 {
                        body.put(b'.');
                    }
                }
                b'g' => write_general(&mut body, magnitude, precision, spec.flags.alt, upper),
                // Hex floats are rendered in exponent form.
                _ => write_exponent(&mut body, magnitude, precision, upper),
            }
        }

        let mut prefix = StackBuf::<1>::new();
        if value.is_sign_negative() && !value.is_nan() {
            prefix.put(b'-');
        } else if spec.flags.plus {
            prefix.put(b'+');
        } else if spec.flags.space {
            prefix.put(b' ');
        }
        let zero_pad = spec.flags.zero && !left && magnitude.is_finite();
        self.field(left, zero_pad, width, prefix.as_bytes(), body.as_bytes());
    }
}

fn int_bits(length: Length, arg: Option<&LogArg<'_>>) -> u32 {
    match length {
        Length::Char => 8,
        Length::Short => 16,
        Length::Long => (std::mem::size_of::<std::ffi::c_long>() * 8) as u32,
        Length::LongLong | Length::IntMax | Length::LongDouble => 64,
        Length::Size | Length::PtrDiff => usize::BITS,
        Length::Default => match arg.map(LogArg::class) {
            Some(ArgClass::Int32) | None => 32,
            Some(ArgClass::Int64) => 64,
            Some(ArgClass::Pointer) => usize::BITS,
        },
    }
}

/// C-style `%e`: mantissa, `e`, sign, at least two exponent digits.
fn write_exponent<S: ByteSink>(out: &mut S, value: f64, precision: usize, upper: bool) {
    let mut tmp = StackBuf::<96>::new();
    let _ = write!(tmp, "{:.*e}", precision, value);
    let text = tmp.as_str();
    let (mantissa, exp) = text.split_once('e').unwrap_or((text, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    out.put_slice(mantissa.as_bytes());
    out.put(if upper { b'E' } else { b'e' });
    out.put(if exp < 0 { b'-' } else { b'+' });
    let mut digits = [0u8; 8];
    let n = cvt_dec(exp.unsigned_abs() as u64, 2, &mut digits);
    out.put_slice(&digits[..n]);
}

/// C-style `%g`: the shorter of `%e`/`%f`, trailing zeros removed unless `#`.
fn write_general<S: ByteSink>(out: &mut S, value: f64, precision: usize, alt: bool, upper: bool) {
    let p = precision.max(1);
    let exponent = if value == 0.0 {
        0
    } else {
        let mut tmp = StackBuf::<96>::new();
        let _ = write!(tmp, "{:.*e}", p - 1, value);
        tmp.as_str()
            .split_once('e')
            .and_then(|(_, e)| e.parse::<i32>().ok())
            .unwrap_or(0)
    };

    let mut tmp = StackBuf::<128>::new();
    if exponent >= -4 && exponent < p as i32 {
        let _ = write!(tmp, "{:.*}", (p as i32 - 1 - exponent) as usize, value);
    } else {
        write_exponent(&mut tmp, value, p - 1, upper);
    }

    let bytes = tmp.as_bytes();
    let split = bytes
        .iter()
        .position(|&b| b == b'e' || b == b'E')
        .unwrap_or(bytes.len());
    let (mut mantissa, exp) = bytes.split_at(split);
    if !alt && mantissa.contains(&b'.') {
        while let [rest @ .., b'0'] = mantissa {
            mantissa = rest;
        }
        if let [rest @ .., b'.'] = mantissa {
            mantissa = rest;
        }
    }
    out.put_slice(mantissa);
    out.put_slice(exp);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(format: &str, args: &[LogArg<'_>]) -> String {
        let mut out = Vec::new();
        let n = vformat(&mut out, format, args);
        assert_eq!(n, out.len());
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_integers() {
        assert_eq!(fmt("%d", &[LogArg::I32(-42)]), "-42");
        assert_eq!(fmt("%5d|%-5d|%05d", &[LogArg::I32(42), LogArg::I32(42), LogArg::I32(-42)]), "   42|42   |-0042");
        assert_eq!(fmt("%+d % d", &[LogArg::I32(7), LogArg::I32(7)]), "+7  7");
        assert_eq!(fmt("%u", &[LogArg::I32(-1)]), "4294967295");
        assert_eq!(fmt("%x %X %#x %#o", &[LogArg::U32(255), LogArg::U32(255), LogArg::U32(255), LogArg::U32(8)]), "ff FF 0xff 010");
        assert_eq!(fmt("%.3d", &[LogArg::I32(5)]), "005");
        assert_eq!(fmt("[%.0d]", &[LogArg::I32(0)]), "[]");
        assert_eq!(fmt("%lld", &[LogArg::I64(-9_000_000_000)]), "-9000000000");
        assert_eq!(fmt("%hhu", &[LogArg::U32(0x1ff)]), "255");
    }

    #[test]
    fn test_natural_width_without_length() {
        assert_eq!(fmt("%d", &[LogArg::U64(5_000_000_000)]), "5000000000");
    }

    #[test]
    fn test_star_width_and_precision() {
        assert_eq!(fmt("%*d", &[LogArg::I32(4), LogArg::I32(7)]), "   7");
        assert_eq!(fmt("%-*d|", &[LogArg::I32(3), LogArg::I32(7)]), "7  |");
        assert_eq!(fmt("%*d|", &[LogArg::I32(-3), LogArg::I32(7)]), "7  |");
        assert_eq!(fmt("%.*s", &[LogArg::I32(2), LogArg::Str("hello")]), "he");
    }

    #[test]
    fn test_strings_and_chars() {
        assert_eq!(fmt("%s: %c%c", &[LogArg::Str("tag"), LogArg::Char('o'), LogArg::U32(b'k' as u32)]), "tag: ok");
        assert_eq!(fmt("[%6s][%-6s]", &[LogArg::Str("ab"), LogArg::Str("ab")]), "[    ab][ab    ]");
        assert_eq!(fmt("%s", &[]), "(null)");
        assert_eq!(fmt("%.2s", &[LogArg::Str("é!")]), "é");
    }

    #[test]
    fn test_floats() {
        assert_eq!(fmt("%f", &[LogArg::F64(3.5)]), "3.500000");
        assert_eq!(fmt("%.2f", &[LogArg::F64(-1.5)]), "-1.50");
        assert_eq!(fmt("%08.3f", &[LogArg::F64(-3.14159)]), "-003.142");
        assert_eq!(fmt("%e", &[LogArg::F64(12345.678)]), "1.234568e+04");
        assert_eq!(fmt("%.1E", &[LogArg::F64(0.00012)]), "1.2E-04");
        assert_eq!(fmt("%g %g %g", &[LogArg::F64(100000.0), LogArg::F64(1e-5), LogArg::F64(0.5)]), "100000 1e-05 0.5");
        assert_eq!(fmt("%f", &[LogArg::F64(f64::INFINITY)]), "inf");
    }

    #[test]
    fn test_percent_and_unknown() {
        assert_eq!(fmt("100%% done", &[]), "100% done");
        assert_eq!(fmt("odd %y here", &[LogArg::I32(1)]), "odd %y here");
        assert_eq!(fmt("trailing %", &[]), "trailing %");
        assert_eq!(fmt("%p", &[LogArg::Ptr(0x3ffb_0000)]), "0x3ffb0000");
    }

    #[test]
    fn test_classes_follow_calling_convention() {
        let classes: Vec<_> = arg_classes("%hhd %c %lu %zu %p %s %g %%").collect();
        assert_eq!(classes[0], ArgClass::Int32);
        assert_eq!(classes[1], ArgClass::Int32);
        assert_eq!(classes[2], c_long_class());
        assert_eq!(classes[3], ArgClass::pointer_width());
        assert_eq!(classes[4], ArgClass::pointer_width());
        assert_eq!(classes[5], ArgClass::Pointer);
        assert_eq!(classes[6], ArgClass::Int64);
        assert_eq!(classes.len(), 7);
    }

    #[test]
    fn test_spec_state_machine() {
        let pieces: Vec<_> = Pieces::new("a%-08.3llxb").collect();
        assert_eq!(pieces.len(), 3);
        match pieces[1] {
            Piece::Spec(spec, raw) => {
                assert!(spec.flags.left && spec.flags.zero);
                assert_eq!(spec.width, Some(Count::Fixed(8)));
                assert_eq!(spec.precision, Some(Count::Fixed(3)));
                assert_eq!(spec.length, Length::LongLong);
                assert_eq!(spec.conv, b'x');
                assert_eq!(raw, b"%-08.3llx");
            }
            other => panic!("expected spec, got {:?}", other),
        }
    }
}
