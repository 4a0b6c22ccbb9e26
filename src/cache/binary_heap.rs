use super::{same_tag, TagCache};
use crate::config::MAX_GENERATION;
use crate::level::LogLevel;

#[derive(Debug, Clone, Copy)]
struct Entry {
    tag: &'static str,
    level: LogLevel,
    generation: u32,
}

/// Min-heap keyed by recency.
///
/// Every insert or hit stamps the entry with the next generation number and
/// sifts it toward the leaves, so the root is always the least recently used
/// entry and the one replaced when the cache is full. Generation numbers are
/// unique, which keeps the ordering strict:
/// `generation[parent(i)] < generation[i]` for every non-root `i`.
///
/// When the counter reaches its ceiling, generations are renumbered by heap
/// index. Parents always sit at lower indices than their children, so the
/// renumbered heap is still valid.
#[derive(Debug)]
pub struct BinaryHeapCache {
    entries: Vec<Entry>,
    capacity: usize,
    generation: u32,
    max_generation: u32,
    check_heap: bool,
}

impl BinaryHeapCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            generation: 0,
            max_generation: MAX_GENERATION,
            check_heap: false,
        }
    }

    /// Lowers the generation ceiling so renumbering can be exercised.
    pub fn with_max_generation(mut self, max_generation: u32) -> Self {
        self.max_generation = max_generation.max(self.capacity as u32 + 1);
        self
    }

    /// Verifies the heap ordering after every access once full (debug builds).
    pub fn with_heap_check(mut self, on: bool) -> Self {
        self.check_heap = on;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current value of the generation counter.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Whether every parent is strictly older than its children.
    pub fn invariant_holds(&self) -> bool {
        (1..self.entries.len())
            .all(|i| self.entries[(i - 1) / 2].generation < self.entries[i].generation)
    }

    /// Tag that would be evicted next.
    pub fn oldest(&self) -> Option<&'static str> {
        self.entries.first().map(|e| e.tag)
    }

    fn next_generation(&mut self) -> u32 {
        if self.generation >= self.max_generation {
            self.renumber();
        }
        let generation = self.generation;
        self.generation += 1;
        generation
    }

    fn renumber(&mut self) {
        tracing::trace!(entries = self.entries.len(), "renumbering tag cache generations");
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.generation = i as u32;
        }
        self.generation = self.entries.len() as u32;
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * i + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.entries[right].generation < self.entries[left].generation {
                right
            } else {
                left
            };
            if self.entries[child].generation >= self.entries[i].generation {
                break;
            }
            self.entries.swap(i, child);
            i = child;
        }
    }

    fn check(&self) {
        if self.check_heap && self.entries.len() == self.capacity {
            debug_assert!(self.invariant_holds(), "tag cache heap ordering violated");
        }
    }
}

impl TagCache for BinaryHeapCache {
    fn get(&mut self, tag: &'static str) -> Option<LogLevel> {
        let i = self.entries.iter().position(|e| same_tag(e.tag, tag))?;
        let level = self.entries[i].level;
        self.entries[i].generation = self.next_generation();
        self.sift_down(i);
        self.check();
        Some(level)
    }

    fn update(&mut self, tag: &str, level: LogLevel) {
        for entry in self.entries.iter_mut().filter(|e| e.tag == tag) {
            entry.level = level;
        }
    }

    fn insert(&mut self, tag: &'static str, level: LogLevel) {
        if self.capacity == 0 {
            return;
        }
        let generation = self.next_generation();
        let entry = Entry { tag, level, generation };
        if self.entries.len() < self.capacity {
            // Newest generation: already ordered after its parent.
            self.entries.push(entry);
        } else {
            tracing::trace!(evicted = self.entries[0].tag, inserted = tag, "tag cache eviction");
            self.entries[0] = entry;
            self.sift_down(0);
        }
        self.check();
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.generation = 0;
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
