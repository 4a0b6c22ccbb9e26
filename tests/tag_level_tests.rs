use std::sync::Arc;
use std::thread;

use taglog::tag_registry::{TagLevelEntry, TagLevels};
use taglog::{CachePolicy, LogError, LogLevel, LoggerConfig};

fn leaked_tags(n: usize) -> Vec<&'static str> {
    (0..n)
        .map(|i| &*Box::leak(format!("tag-{:03}", i).into_boxed_str()))
        .collect()
}

fn levels(policy: CachePolicy, cache_size: usize) -> TagLevels {
    TagLevels::new(
        &LoggerConfig::default()
            .with_cache_policy(policy)
            .with_cache_size(cache_size),
    )
}

#[test]
fn test_more_tags_than_cache_slots() {
    let tags = leaked_tags(100);
    for policy in [CachePolicy::Array, CachePolicy::BinaryHeap, CachePolicy::Disabled] {
        let levels = levels(policy, 7);
        for (i, tag) in tags.iter().enumerate() {
            levels.set_level(*tag, LogLevel::from_u8((i % 6) as u8)).unwrap();
        }
        for round in 0..3 {
            for (i, tag) in tags.iter().enumerate().rev() {
                assert_eq!(
                    levels.get_level(*tag),
                    LogLevel::from_u8((i % 6) as u8),
                    "{:?} round {}",
                    policy,
                    round
                );
            }
        }
        assert!(levels.cached_count() <= 7);
        assert_eq!(levels.tag_count(), 100);
    }
}

#[test]
fn test_cached_levels_follow_updates() {
    static TAG: &str = "follow";
    let levels = levels(CachePolicy::BinaryHeap, 4);
    levels.set_level(TAG, LogLevel::Warn).unwrap();
    assert_eq!(levels.get_level(TAG), LogLevel::Warn);
    assert_eq!(levels.cached_count(), 1);

    // Same text under a different handle updates the cached entry.
    let runtime: &'static str = Box::leak(String::from("follow").into_boxed_str());
    levels.set_level(runtime, LogLevel::Verbose).unwrap();
    assert_eq!(levels.get_level(TAG), LogLevel::Verbose);
    assert_eq!(levels.tag_count(), 1);
}

#[test]
fn test_unknown_tags_get_default_and_are_cached() {
    let levels = TagLevels::new(&LoggerConfig::default().with_default_level(LogLevel::Debug));
    assert_eq!(levels.get_level("never-set"), LogLevel::Debug);
    assert_eq!(levels.tag_count(), 0);
    assert_eq!(levels.cached_count(), 1);
}

#[test]
fn test_entries_newest_first() {
    let levels = levels(CachePolicy::Array, 4);
    levels.set_level("first", LogLevel::Error).unwrap();
    levels.set_level("second", LogLevel::Warn).unwrap();
    levels.set_level("first", LogLevel::Debug).unwrap();

    assert_eq!(
        levels.entries(),
        vec![
            TagLevelEntry { tag: "second", level: LogLevel::Warn },
            TagLevelEntry { tag: "first", level: LogLevel::Debug },
        ]
    );

    levels.clear();
    assert!(levels.entries().is_empty());
    assert_eq!(levels.cached_count(), 0);
    assert_eq!(levels.default_level(), LogLevel::Info);
}

#[test]
fn test_registry_bound() {
    let levels = TagLevels::new(&LoggerConfig::default().with_max_tags(2));
    levels.set_level("a", LogLevel::Warn).unwrap();
    levels.set_level("b", LogLevel::Warn).unwrap();
    assert_eq!(
        levels.set_level("c", LogLevel::Warn),
        Err(LogError::RegistryFull { capacity: 2 })
    );
    assert_eq!(levels.get_level("c"), LogLevel::Info);

    // The wildcard is not a registry entry.
    levels.set_level("*", LogLevel::Error).unwrap();
    levels.set_level("c", LogLevel::Warn).unwrap();
    assert_eq!(levels.tag_count(), 1);
}

#[test]
fn test_concurrent_set_and_get() {
    let tags = Arc::new(leaked_tags(16));
    let levels = Arc::new(levels(CachePolicy::BinaryHeap, 7));
    for tag in tags.iter() {
        levels.set_level(*tag, LogLevel::Warn).unwrap();
    }

    let readers: Vec<_> = (0..4)
        .map(|t| {
            let levels = Arc::clone(&levels);
            let tags = Arc::clone(&tags);
            thread::spawn(move || {
                for i in 0..2_000 {
                    let level = levels.get_level(tags[(i * 7 + t) % tags.len()]);
                    assert!(
                        level == LogLevel::Warn || level == LogLevel::Debug,
                        "unexpected {:?}",
                        level
                    );
                }
            })
        })
        .collect();

    let writer = {
        let levels = Arc::clone(&levels);
        let tags = Arc::clone(&tags);
        thread::spawn(move || {
            for (i, tag) in tags.iter().enumerate().cycle().take(500) {
                let level = if i % 2 == 0 { LogLevel::Debug } else { LogLevel::Warn };
                levels.set_level(*tag, level).unwrap();
            }
        })
    };

    for reader in readers {
        reader.join().unwrap();
    }
    writer.join().unwrap();
    assert_eq!(levels.tag_count(), 16);
}
