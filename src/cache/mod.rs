//! Post list cache.
//!
//! Caches the *unfiltered* post sets returned by storage, keyed by the
//! audience they were fetched for. Security filtering always runs after a
//! lookup, so one entry can serve every caller of a scope.
//!
//! Behavior is controlled via the `[cache]` table of `commons.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! post_list_limit = 256
//! ```

mod config;
mod keys;
mod lock;
mod store;

pub use config::CacheConfig;
pub use keys::PostListKey;
pub use store::{DisabledPostCache, L0PostStore, PostCache, PostList};

use std::sync::Arc;

/// Builds the cache implementation selected by configuration.
pub fn build(config: &CacheConfig) -> Arc<dyn PostCache> {
    if config.enabled {
        Arc::new(L0PostStore::new(config))
    } else {
        Arc::new(DisabledPostCache)
    }
}
