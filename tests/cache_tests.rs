use std::collections::VecDeque;

use taglog::cache::{new_cache, ArrayCache, BinaryHeapCache, TagCache};
use taglog::{CachePolicy, LogLevel};

static TAGS: [&str; 12] = [
    "wifi", "net", "disk", "boot", "uart", "spi", "i2c", "adc", "pwm", "gpio", "nvs", "ota",
];

/// Small deterministic sequence so failures are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

fn level_for(i: usize) -> LogLevel {
    LogLevel::from_u8((i % 5 + 1) as u8)
}

#[test]
fn test_heap_matches_lru_model() {
    let mut cache = BinaryHeapCache::new(7).with_heap_check(true);
    let mut model: VecDeque<&'static str> = VecDeque::new();
    let mut rng = Lcg(42);

    for step in 0..5_000 {
        let i = rng.next(TAGS.len());
        let tag = TAGS[i];
        match cache.get(tag) {
            Some(level) => {
                assert_eq!(level, level_for(i));
                let pos = model.iter().position(|t| *t == tag).unwrap();
                model.remove(pos);
                model.push_back(tag);
            }
            None => {
                assert!(!model.contains(&tag), "step {}: cache lost {}", step, tag);
                cache.insert(tag, level_for(i));
                if model.len() == 7 {
                    model.pop_front();
                }
                model.push_back(tag);
            }
        }
        assert_eq!(cache.oldest(), model.front().copied(), "step {}", step);
        assert!(cache.invariant_holds());
    }
}

#[test]
fn test_heap_renumbering_under_load() {
    let mut cache = BinaryHeapCache::new(7).with_max_generation(20).with_heap_check(true);
    let mut rng = Lcg(7);
    for _ in 0..2_000 {
        let i = rng.next(TAGS.len());
        if cache.get(TAGS[i]).is_none() {
            cache.insert(TAGS[i], level_for(i));
        }
        assert!(cache.invariant_holds());
        assert!(cache.generation() <= 20);
    }
    assert_eq!(cache.len(), 7);
}

#[test]
fn test_array_matches_fifo_model() {
    let mut cache = ArrayCache::new(5);
    let mut model: VecDeque<&'static str> = VecDeque::new();
    let mut rng = Lcg(1234);

    for step in 0..5_000 {
        let i = rng.next(TAGS.len());
        let tag = TAGS[i];
        match cache.get(tag) {
            Some(level) => {
                assert_eq!(level, level_for(i));
                assert!(model.contains(&tag));
            }
            None => {
                assert!(!model.contains(&tag), "step {}: cache lost {}", step, tag);
                cache.insert(tag, level_for(i));
                if model.len() == 5 {
                    model.pop_front();
                }
                model.push_back(tag);
            }
        }
        assert_eq!(cache.len(), model.len());
    }
}

#[test]
fn test_lookups_are_by_identity() {
    let copy: &'static str = Box::leak(String::from(TAGS[0]).into_boxed_str());
    for policy in [CachePolicy::Array, CachePolicy::BinaryHeap] {
        let mut cache = new_cache(policy, 4, true);
        cache.insert(TAGS[0], LogLevel::Warn);
        assert_eq!(cache.get(TAGS[0]), Some(LogLevel::Warn));
        assert_eq!(cache.get(copy), None, "{:?}", policy);

        // Updates compare by content and reach the cached handle.
        cache.update(copy, LogLevel::Debug);
        assert_eq!(cache.get(TAGS[0]), Some(LogLevel::Debug));
    }
}

#[test]
fn test_clear_and_disabled() {
    for policy in [CachePolicy::Array, CachePolicy::BinaryHeap, CachePolicy::Disabled] {
        let mut cache = new_cache(policy, 4, false);
        for (i, tag) in TAGS[..3].iter().enumerate() {
            cache.insert(*tag, level_for(i));
        }
        if policy == CachePolicy::Disabled {
            assert!(cache.is_empty());
            assert_eq!(cache.get(TAGS[0]), None);
        } else {
            assert_eq!(cache.len(), 3);
        }
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(TAGS[1]), None);
    }
}
