//! Integer-to-text conversion and the CRC-8 used by binary records.
//!
//! Everything here is allocation free and safe to call from constrained
//! contexts.

pub const DIGITS_LOWER: &[u8; 16] = b"0123456789abcdef";
pub const DIGITS_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Converts `val` to text in `radix`, left-padded with zeros to `pad` digits.
///
/// Digits are written to the start of `buf` and the number of bytes written is
/// returned. When the number has more digits than `pad`, all of them are
/// written. Output that does not fit in `buf` is cut off at the end.
///
/// # Examples
///
/// ```
/// # use taglog::codec::{cvt, DIGITS_LOWER};
/// let mut buf = [0u8; 20];
/// let len = cvt(123456, 10, 8, DIGITS_LOWER, &mut buf);
/// assert_eq!(&buf[..len], b"00123456");
///
/// let len = cvt(0x73f, 16, 2, DIGITS_LOWER, &mut buf);
/// assert_eq!(&buf[..len], b"73f");
/// ```
pub fn cvt(mut val: u64, radix: u32, pad: usize, digits: &[u8; 16], buf: &mut [u8]) -> usize {
    let radix = radix.clamp(2, 16) as u64;

    // Least significant digit first, reversed on copy.
    let mut scratch = [0u8; 64];
    let mut count = 0;
    loop {
        scratch[count] = digits[(val % radix) as usize];
        count += 1;
        val /= radix;
        if val == 0 {
            break;
        }
    }

    let zeros = pad.saturating_sub(count);
    let total = (zeros + count).min(buf.len());
    for (i, slot) in buf[..total].iter_mut().enumerate() {
        *slot = if i < zeros {
            b'0'
        } else {
            scratch[count - 1 - (i - zeros)]
        };
    }
    total
}

/// Decimal shorthand for [`cvt`].
pub fn cvt_dec(val: u64, pad: usize, buf: &mut [u8]) -> usize {
    cvt(val, 10, pad, DIGITS_LOWER, buf)
}

/// Lowercase hexadecimal shorthand for [`cvt`].
pub fn cvt_hex(val: u64, pad: usize, buf: &mut [u8]) -> usize {
    cvt(val, 16, pad, DIGITS_LOWER, buf)
}

/// Folds one byte into a running CRC-8 (polynomial 0x07, not reflected).
#[inline]
pub const fn crc8_update(mut crc: u8, byte: u8) -> u8 {
    crc ^= byte;
    let mut bit = 0;
    while bit < 8 {
        crc = if crc & 0x80 != 0 { (crc << 1) ^ 0x07 } else { crc << 1 };
        bit += 1;
    }
    crc
}

/// CRC-8 of a whole byte sequence, starting from zero.
pub fn crc8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |crc, &b| crc8_update(crc, b))
}
