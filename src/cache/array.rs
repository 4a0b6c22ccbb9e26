use super::{same_tag, TagCache};
use crate::level::LogLevel;

#[derive(Debug, Clone, Copy)]
struct Slot {
    tag: &'static str,
    level: LogLevel,
}

/// Insertion-order ring buffer.
///
/// Hits do not reorder anything; on overflow the slot written longest ago is
/// overwritten.
#[derive(Debug)]
pub struct ArrayCache {
    slots: Box<[Option<Slot>]>,
    next: usize,
    len: usize,
}

impl ArrayCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)].into_boxed_slice(),
            next: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl TagCache for ArrayCache {
    fn get(&mut self, tag: &'static str) -> Option<LogLevel> {
        self.slots[..self.len]
            .iter()
            .flatten()
            .find(|slot| same_tag(slot.tag, tag))
            .map(|slot| slot.level)
    }

    fn update(&mut self, tag: &str, level: LogLevel) {
        for slot in self.slots[..self.len].iter_mut().flatten() {
            if slot.tag == tag {
                slot.level = level;
            }
        }
    }

    fn insert(&mut self, tag: &'static str, level: LogLevel) {
        if let Some(Slot { tag: evicted, .. }) = self.slots[self.next] {
            tracing::trace!(evicted, inserted = tag, "tag cache slot overwritten");
        }
        self.slots[self.next] = Some(Slot { tag, level });
        self.next = (self.next + 1) % self.slots.len();
        self.len = (self.len + 1).min(self.slots.len());
    }

    fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.next = 0;
        self.len = 0;
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static A: &str = "a";
    static B: &str = "b";
    static C: &str = "c";

    #[test]
    fn test_overwrites_oldest() {
        let mut cache = ArrayCache::new(2);
        cache.insert(A, LogLevel::Error);
        cache.insert(B, LogLevel::Warn);
        // Hits do not protect "a" from eviction.
        assert_eq!(cache.get(A), Some(LogLevel::Error));
        cache.insert(C, LogLevel::Info);
        assert_eq!(cache.get(A), None);
        assert_eq!(cache.get(B), Some(LogLevel::Warn));
        assert_eq!(cache.get(C), Some(LogLevel::Info));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_update_is_pass_through() {
        let mut cache = ArrayCache::new(4);
        cache.update(A, LogLevel::Debug);
        assert_eq!(cache.get(A), None);
        cache.insert(A, LogLevel::Info);
        cache.update(A, LogLevel::Debug);
        assert_eq!(cache.get(A), Some(LogLevel::Debug));
        cache.clear();
        assert!(cache.is_empty());
    }
}
