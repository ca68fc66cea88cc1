//! Cache configuration.

use std::num::NonZeroUsize;

const DEFAULT_POST_LIST_LIMIT: usize = 256;

/// Cache configuration resolved from the `[cache]` settings table.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Enable the in-memory post list cache.
    pub enabled: bool,
    /// Maximum number of cached post lists before LRU eviction.
    pub post_list_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            post_list_limit: DEFAULT_POST_LIST_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            post_list_limit: settings.post_list_limit,
        }
    }
}

impl CacheConfig {
    /// Returns the post list limit as NonZeroUsize, clamping to 1 if zero.
    pub fn post_list_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.post_list_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
