//! Per-tag level registry.
//!
//! The ground truth is a list of explicitly configured tags, newest first,
//! compared by content. A bounded [`TagCache`] in front of it answers repeated
//! lookups by tag identity. Both live under one lock; the dispatch path only
//! ever waits on it for a bounded time.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::cache::{new_cache, TagCache};
use crate::config::LoggerConfig;
use crate::error::LogError;
use crate::level::LogLevel;

/// Tag that addresses every tag at once.
pub const WILDCARD: &str = "*";

/// One explicitly configured tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagLevelEntry {
    pub tag: &'static str,
    pub level: LogLevel,
}

struct Registry {
    /// Oldest first; searched from the back.
    entries: Vec<TagLevelEntry>,
    cache: Box<dyn TagCache>,
}

impl Registry {
    fn find_mut(&mut self, tag: &str) -> Option<&mut TagLevelEntry> {
        self.entries.iter_mut().rev().find(|e| e.tag == tag)
    }

    fn find(&self, tag: &str) -> Option<LogLevel> {
        self.entries.iter().rev().find(|e| e.tag == tag).map(|e| e.level)
    }
}

/// Thread-safe map from tag to level with a default for unknown tags.
///
/// # Examples
///
/// ```
/// # use taglog::{LogLevel, LoggerConfig};
/// # use taglog::tag_registry::TagLevels;
/// let levels = TagLevels::new(&LoggerConfig::default());
/// levels.set_level("wifi", LogLevel::Debug).unwrap();
/// assert_eq!(levels.get_level("wifi"), LogLevel::Debug);
/// assert_eq!(levels.get_level("other"), LogLevel::Info);
///
/// levels.set_level("*", LogLevel::Warn).unwrap();
/// assert_eq!(levels.get_level("wifi"), LogLevel::Warn);
/// ```
pub struct TagLevels {
    default_level: AtomicU8,
    max_tags: Option<usize>,
    registry: Mutex<Registry>,
}

impl TagLevels {
    pub fn new(config: &LoggerConfig) -> Self {
        Self {
            default_level: AtomicU8::new(config.default_level as u8),
            max_tags: config.max_tags,
            registry: Mutex::new(Registry {
                entries: Vec::new(),
                cache: new_cache(config.cache_policy, config.cache_size, config.check_heap),
            }),
        }
    }

    /// Level used for tags without an explicit setting.
    pub fn default_level(&self) -> LogLevel {
        LogLevel::from_u8(self.default_level.load(Ordering::Relaxed))
    }

    /// Sets the level of `tag`.
    ///
    /// `"*"` sets the default level and forgets every explicit setting.
    /// A `None` tag is ignored. On error the registry is left unchanged.
    pub fn set_level<T>(&self, tag: T, level: LogLevel) -> Result<(), LogError>
    where
        T: Into<Option<&'static str>>,
    {
        let Some(tag) = tag.into() else {
            return Ok(());
        };

        let mut registry = self.registry.lock();
        if tag == WILDCARD {
            self.default_level.store(level as u8, Ordering::Relaxed);
            registry.entries.clear();
            registry.cache.clear();
            tracing::debug!(%level, "default tag level set, explicit tag levels cleared");
            return Ok(());
        }

        if let Some(entry) = registry.find_mut(tag) {
            entry.level = level;
        } else {
            if let Some(capacity) = self.max_tags {
                if registry.entries.len() >= capacity {
                    return Err(LogError::RegistryFull { capacity });
                }
            }
            registry
                .entries
                .try_reserve(1)
                .map_err(|_| LogError::OutOfMemory)?;
            registry.entries.push(TagLevelEntry { tag, level });
            tracing::debug!(tag, %level, "tag registered");
        }
        registry.cache.update(tag, level);
        Ok(())
    }

    /// Level of `tag`, waiting for the registry lock as long as needed.
    pub fn get_level<T>(&self, tag: T) -> LogLevel
    where
        T: Into<Option<&'static str>>,
    {
        match tag.into() {
            Some(tag) => Self::resolve(&mut self.registry.lock(), tag, self.default_level()),
            None => self.default_level(),
        }
    }

    /// Like [`get_level`](Self::get_level), but gives up after `timeout` and
    /// answers [`LogLevel::None`] ("do not log").
    pub fn get_level_with_timeout(&self, tag: Option<&'static str>, timeout: Duration) -> LogLevel {
        let Some(tag) = tag else {
            return self.default_level();
        };
        self.registry
            .try_lock_for(timeout)
            .map_or(LogLevel::None, |mut registry| {
                Self::resolve(&mut registry, tag, self.default_level())
            })
    }

    /// Non-blocking lookup; answers [`LogLevel::None`] under contention.
    pub fn try_get_level(&self, tag: Option<&'static str>) -> LogLevel {
        let Some(tag) = tag else {
            return self.default_level();
        };
        self.registry
            .try_lock()
            .map_or(LogLevel::None, |mut registry| {
                Self::resolve(&mut registry, tag, self.default_level())
            })
    }

    fn resolve(registry: &mut MutexGuard<'_, Registry>, tag: &'static str, default: LogLevel) -> LogLevel {
        if let Some(level) = registry.cache.get(tag) {
            return level;
        }
        let level = registry.find(tag).unwrap_or(default);
        registry.cache.insert(tag, level);
        level
    }

    /// Number of explicitly configured tags.
    pub fn tag_count(&self) -> usize {
        self.registry.lock().entries.len()
    }

    /// Number of tags currently cached.
    pub fn cached_count(&self) -> usize {
        self.registry.lock().cache.len()
    }

    /// Explicit settings, newest first.
    pub fn entries(&self) -> Vec<TagLevelEntry> {
        self.registry.lock().entries.iter().rev().copied().collect()
    }

    /// Forgets every explicit setting; the default level is kept.
    pub fn clear(&self) {
        let mut registry = self.registry.lock();
        registry.entries.clear();
        registry.cache.clear();
    }
}
