use std::fmt;

/// Width class of a log argument as seen by the variadic calling convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgClass {
    Int32,
    Int64,
    /// A string reference: an image address or an embedded copy on the wire.
    Pointer,
}

impl ArgClass {
    /// Two-bit code used by the argument descriptor. Zero terminates the list.
    pub const fn code(self) -> u8 {
        match self {
            ArgClass::Int32 => 1,
            ArgClass::Int64 => 2,
            ArgClass::Pointer => 3,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code & 0b11 {
            1 => Some(ArgClass::Int32),
            2 => Some(ArgClass::Int64),
            3 => Some(ArgClass::Pointer),
            _ => None,
        }
    }

    /// Class of a pointer-sized integer on this platform.
    pub const fn pointer_width() -> Self {
        if usize::BITS > 32 {
            ArgClass::Int64
        } else {
            ArgClass::Int32
        }
    }
}

/// One argument of a log call.
///
/// Replaces a C `va_list`: the caller builds a slice of these (usually through
/// the logging macros) and formatters walk it without reinterpreting memory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogArg<'a> {
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F64(f64),
    Char(char),
    Str(&'a str),
    Ptr(usize),
}

impl<'a> LogArg<'a> {
    /// Natural class of the value, independent of any format string.
    pub const fn class(&self) -> ArgClass {
        match self {
            LogArg::I32(_) | LogArg::U32(_) | LogArg::Char(_) => ArgClass::Int32,
            LogArg::I64(_) | LogArg::U64(_) | LogArg::F64(_) => ArgClass::Int64,
            LogArg::Ptr(_) => ArgClass::pointer_width(),
            LogArg::Str(_) => ArgClass::Pointer,
        }
    }

    /// Raw bits, sign-extended for signed values, floats by bit pattern.
    pub fn as_u64(&self) -> u64 {
        match *self {
            LogArg::I32(v) => v as i64 as u64,
            LogArg::U32(v) => v as u64,
            LogArg::I64(v) => v as u64,
            LogArg::U64(v) => v,
            LogArg::F64(v) => v.to_bits(),
            LogArg::Char(c) => c as u64,
            LogArg::Str(s) => s.as_ptr() as usize as u64,
            LogArg::Ptr(p) => p as u64,
        }
    }

    /// Value as a signed 64-bit integer (floats truncate).
    pub fn as_i64(&self) -> i64 {
        match *self {
            LogArg::F64(v) => v as i64,
            _ => self.as_u64() as i64,
        }
    }

    /// Value as a double (integers convert numerically).
    pub fn as_f64(&self) -> f64 {
        match *self {
            LogArg::F64(v) => v,
            LogArg::I32(v) => v as f64,
            LogArg::I64(v) => v as f64,
            _ => self.as_u64() as f64,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            LogArg::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for LogArg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogArg::I32(v) => write!(f, "{}", v),
            LogArg::U32(v) => write!(f, "{}", v),
            LogArg::I64(v) => write!(f, "{}", v),
            LogArg::U64(v) => write!(f, "{}", v),
            LogArg::F64(v) => write!(f, "{}", v),
            LogArg::Char(c) => write!(f, "{}", c),
            LogArg::Str(s) => f.write_str(s),
            LogArg::Ptr(p) => write!(f, "{:#x}", p),
        }
    }
}

/// A trait for values that can be passed to the logging macros.
pub trait Loggable {
    fn to_log_arg(&self) -> LogArg<'_>;
}

macro_rules! impl_loggable {
    ($($ty:ty => $variant:ident as $conv:ty),* $(,)?) => {
        $(
            impl Loggable for $ty {
                #[inline]
                fn to_log_arg(&self) -> LogArg<'_> {
                    LogArg::$variant(*self as $conv)
                }
            }
        )*
    };
}

impl_loggable! {
    i8 => I32 as i32,
    i16 => I32 as i32,
    i32 => I32 as i32,
    u8 => U32 as u32,
    u16 => U32 as u32,
    u32 => U32 as u32,
    i64 => I64 as i64,
    u64 => U64 as u64,
    isize => I64 as i64,
    usize => U64 as u64,
    f32 => F64 as f64,
    f64 => F64 as f64,
}

impl Loggable for bool {
    fn to_log_arg(&self) -> LogArg<'_> {
        LogArg::U32(*self as u32)
    }
}

impl Loggable for char {
    fn to_log_arg(&self) -> LogArg<'_> {
        LogArg::Char(*self)
    }
}

impl Loggable for str {
    fn to_log_arg(&self) -> LogArg<'_> {
        LogArg::Str(self)
    }
}

impl Loggable for String {
    fn to_log_arg(&self) -> LogArg<'_> {
        LogArg::Str(self.as_str())
    }
}

impl<T: Loggable + ?Sized> Loggable for &T {
    fn to_log_arg(&self) -> LogArg<'_> {
        (**self).to_log_arg()
    }
}

impl<T> Loggable for *const T {
    fn to_log_arg(&self) -> LogArg<'_> {
        LogArg::Ptr(*self as usize)
    }
}

impl<T> Loggable for *mut T {
    fn to_log_arg(&self) -> LogArg<'_> {
        LogArg::Ptr(*self as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_conversion() {
        assert_eq!(42i32.to_log_arg(), LogArg::I32(42));
        assert_eq!(7u8.to_log_arg(), LogArg::U32(7));
        assert_eq!(3.5f32.to_log_arg(), LogArg::F64(3.5));
        assert_eq!((-1i64).to_log_arg().as_u64(), u64::MAX);
        assert_eq!((-1i32).to_log_arg().as_u64(), u64::MAX);
    }

    #[test]
    fn test_string_conversion() {
        let owned = String::from("owned");
        assert_eq!(owned.to_log_arg(), LogArg::Str("owned"));
        assert_eq!("lit".to_log_arg().as_str(), Some("lit"));
    }

    #[test]
    fn test_classes() {
        assert_eq!(true.to_log_arg().class(), ArgClass::Int32);
        assert_eq!(9u64.to_log_arg().class(), ArgClass::Int64);
        assert_eq!("s".to_log_arg().class(), ArgClass::Pointer);
        assert_eq!(ArgClass::from_code(ArgClass::Int64.code()), Some(ArgClass::Int64));
        assert_eq!(ArgClass::from_code(0), None);
    }
}
