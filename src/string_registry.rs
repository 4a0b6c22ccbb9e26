use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use parking_lot::RwLock;

use crate::config::{IMAGE_BASE, IMAGE_SIZE};
use crate::error::LogError;

/// Image string table for compact binary logging.
///
/// Firmware places format strings and tags in read-only flash, so a binary
/// record only needs their address; an offline decoder resolves the text from
/// the firmware image. This module plays the role of that image: every
/// registered `&'static str` is laid out at a stable 32-bit address inside
/// `IMAGE_BASE..IMAGE_BASE + IMAGE_SIZE`, NUL separated, the way a linker
/// would place `.rodata`.
///
/// Lookups by string go through pointer identity (`ptr` + `len`), not content:
/// a dynamically built string with the same text as a registered literal is
/// not "in the image" and gets embedded by the encoder instead.
///
/// # Thread Safety
///
/// The table is process-wide and append-only. Readers take a shared lock that
/// is only contended while a new string is being registered.
struct ImageTable {
    by_ptr: HashMap<(usize, usize), u32>,
    by_content: HashMap<&'static str, u32>,
    by_addr: HashMap<u32, &'static str>,
    interned: HashSet<&'static str>,
    next_offset: u32,
}

lazy_static! {
    static ref IMAGE: RwLock<ImageTable> = RwLock::new(ImageTable {
        by_ptr: HashMap::new(),
        by_content: HashMap::new(),
        by_addr: HashMap::new(),
        interned: HashSet::new(),
        next_offset: 0,
    });
}

#[inline]
fn identity(s: &str) -> (usize, usize) {
    (s.as_ptr() as usize, s.len())
}

/// Places a string in the image and returns its address.
///
/// Registering the same literal twice returns the same address. A different
/// literal with identical content shares the existing address, like linker
/// string merging.
///
/// # Errors
///
/// [`LogError::ImageFull`] when the simulated image has no room left.
///
/// # Examples
///
/// ```
/// # use taglog::string_registry::{register_string, get_string};
/// let addr = register_string("wifi: connected to %s").unwrap();
/// assert_eq!(register_string("wifi: connected to %s").unwrap(), addr);
/// assert_eq!(get_string(addr), Some("wifi: connected to %s"));
/// ```
pub fn register_string(s: &'static str) -> Result<u32, LogError> {
    // Fast path: already placed
    if let Some(&addr) = IMAGE.read().by_ptr.get(&identity(s)) {
        return Ok(addr);
    }

    let mut image = IMAGE.write();
    if let Some(&addr) = image.by_ptr.get(&identity(s)) {
        return Ok(addr);
    }
    if let Some(&addr) = image.by_content.get(s) {
        image.by_ptr.insert(identity(s), addr);
        return Ok(addr);
    }

    let footprint = u32::try_from(s.len() + 1).map_err(|_| LogError::ImageFull)?;
    let end = image
        .next_offset
        .checked_add(footprint)
        .filter(|&end| end <= IMAGE_SIZE)
        .ok_or(LogError::ImageFull)?;

    let addr = IMAGE_BASE + image.next_offset;
    image.next_offset = end;
    image.by_ptr.insert(identity(s), addr);
    image.by_content.insert(s, addr);
    image.by_addr.insert(addr, s);
    Ok(addr)
}

/// Returns the image address of `s` if this exact string (same storage) was
/// registered.
pub fn lookup(s: &str) -> Option<u32> {
    IMAGE.read().by_ptr.get(&identity(s)).copied()
}

/// Looks up a string by its image address.
///
/// Returns `None` for address 0 and for addresses that do not start a
/// registered string.
pub fn get_string(addr: u32) -> Option<&'static str> {
    if addr == 0 {
        return None;
    }
    IMAGE.read().by_addr.get(&addr).copied()
}

/// Address range test: true when `addr` falls inside the occupied part of the
/// image.
pub fn contains(addr: u32) -> bool {
    let end = IMAGE_BASE + IMAGE.read().next_offset;
    (IMAGE_BASE..end).contains(&addr)
}

/// Promotes a runtime string to `'static`, deduplicated by content.
///
/// Tag strings must outlive the registry that refers to them. Strings built at
/// runtime (for example from a directive list) are leaked once per distinct
/// content; registered literals with the same text are returned as-is.
pub fn intern(s: &str) -> &'static str {
    {
        let image = IMAGE.read();
        if let Some(&addr) = image.by_content.get(s) {
            if let Some(&existing) = image.by_addr.get(&addr) {
                return existing;
            }
        }
        if let Some(&existing) = image.interned.get(s) {
            return existing;
        }
    }

    let mut image = IMAGE.write();
    if let Some(&existing) = image.interned.get(s) {
        return existing;
    }
    let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
    image.interned.insert(leaked);
    leaked
}
