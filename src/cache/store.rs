//! Cache storage implementations.

use std::sync::{Arc, RwLock};

use lru::LruCache;
use metrics::counter;
use tracing::debug;

use crate::domain::entities::PostRecord;
use crate::infra::telemetry::{
    CACHE_EVICT_TOTAL, CACHE_HIT_TOTAL, CACHE_INVALIDATE_TOTAL, CACHE_MISS_TOTAL,
};

use super::config::CacheConfig;
use super::keys::PostListKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Shared, immutable post list as returned by storage.
pub type PostList = Arc<[PostRecord]>;

/// Keyed storage for unfiltered post lists.
pub trait PostCache: Send + Sync {
    fn get(&self, key: &PostListKey) -> Option<PostList>;

    /// Stores `posts` under `key`, replacing any previous entry wholesale.
    fn put(&self, key: PostListKey, posts: PostList);

    /// Removes the entry for `key`. Absent keys are a no-op.
    fn invalidate(&self, key: &PostListKey);
}

/// In-memory post list cache with LRU eviction.
pub struct L0PostStore {
    post_lists: RwLock<LruCache<PostListKey, PostList>>,
}

impl L0PostStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            post_lists: RwLock::new(LruCache::new(config.post_list_limit_non_zero())),
        }
    }

    /// Number of cached post lists.
    pub fn len(&self) -> usize {
        rw_read(&self.post_lists, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PostCache for L0PostStore {
    fn get(&self, key: &PostListKey) -> Option<PostList> {
        let cached = rw_write(&self.post_lists, SOURCE, "get")
            .get(key)
            .cloned();
        match cached {
            Some(posts) => {
                counter!(CACHE_HIT_TOTAL, "kind" => key.kind()).increment(1);
                Some(posts)
            }
            None => {
                counter!(CACHE_MISS_TOTAL, "kind" => key.kind()).increment(1);
                None
            }
        }
    }

    fn put(&self, key: PostListKey, posts: PostList) {
        let evicted = rw_write(&self.post_lists, SOURCE, "put").push(key.clone(), posts);
        // `push` also returns the old value when replacing the same key.
        if let Some((evicted_key, _)) = evicted.filter(|(evicted_key, _)| *evicted_key != key) {
            counter!(CACHE_EVICT_TOTAL, "kind" => evicted_key.kind()).increment(1);
            debug!(
                target = SOURCE,
                key = %evicted_key,
                kind = evicted_key.kind(),
                "Evicted post list at capacity"
            );
        }
    }

    fn invalidate(&self, key: &PostListKey) {
        let removed = rw_write(&self.post_lists, SOURCE, "invalidate").pop(key);
        if removed.is_some() {
            counter!(CACHE_INVALIDATE_TOTAL, "kind" => key.kind()).increment(1);
        }
    }
}

/// Cache used when caching is disabled; every lookup misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledPostCache;

impl PostCache for DisabledPostCache {
    fn get(&self, key: &PostListKey) -> Option<PostList> {
        counter!(CACHE_MISS_TOTAL, "kind" => key.kind()).increment(1);
        None
    }

    fn put(&self, _key: PostListKey, _posts: PostList) {}

    fn invalidate(&self, _key: &PostListKey) {}
}
