//! Bounded tag level caches.
//!
//! A cache sits in front of the tag registry's ground-truth list and answers
//! repeated lookups for the same tag without a string comparison. Entries are
//! keyed by tag *identity* (address and length of the `&'static str`): an entry
//! is only ever inserted after the registry resolved the tag by content, so two
//! handles to the same text at different addresses simply occupy two entries.

mod array;
mod binary_heap;

pub use array::ArrayCache;
pub use binary_heap::BinaryHeapCache;

use crate::config::CachePolicy;
use crate::level::LogLevel;

/// Storage strategy for cached tag levels.
pub trait TagCache: Send {
    /// Looks a tag up by identity. A hit may reorder the cache.
    fn get(&mut self, tag: &'static str) -> Option<LogLevel>;

    /// Refreshes the level of an already cached tag (compared by content).
    /// Never inserts.
    fn update(&mut self, tag: &str, level: LogLevel);

    /// Adds a tag, evicting another one when full.
    fn insert(&mut self, tag: &'static str, level: LogLevel);

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache that never holds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCache;

impl TagCache for DisabledCache {
    fn get(&mut self, _tag: &'static str) -> Option<LogLevel> {
        None
    }

    fn update(&mut self, _tag: &str, _level: LogLevel) {}

    fn insert(&mut self, _tag: &'static str, _level: LogLevel) {}

    fn clear(&mut self) {}

    fn len(&self) -> usize {
        0
    }
}

/// Builds the cache selected by `policy`.
///
/// `check_heap` turns on the min-heap invariant check in debug builds.
pub fn new_cache(policy: CachePolicy, capacity: usize, check_heap: bool) -> Box<dyn TagCache> {
    match policy {
        CachePolicy::Array if capacity > 0 => Box::new(ArrayCache::new(capacity)),
        CachePolicy::BinaryHeap if capacity > 0 => {
            Box::new(BinaryHeapCache::new(capacity).with_heap_check(check_heap))
        }
        _ => Box::new(DisabledCache),
    }
}

#[inline]
pub(crate) fn same_tag(a: &'static str, b: &'static str) -> bool {
    std::ptr::eq(a.as_ptr(), b.as_ptr()) && a.len() == b.len()
}
