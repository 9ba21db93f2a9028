//! In-process entity caches for feed hydration.
//!
//! Three keyed caches sit in front of the entity store:
//!
//! - **users**: user rows by id
//! - **comment_counts**: number of comments per post
//! - **recent_comments**: newest comments per post, newest first
//!
//! Reads go through [`cache_aside`]; writes patch entries in place through
//! [`KeyedCache::update`]. Entries are advisory snapshots and are never
//! trusted over the store, only refreshed lazily on a miss.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! page_size = 20
//! recent_comment_window = 3
//! # capacity = 100000   # optional LRU bound per cache
//! ```

mod aside;
mod config;
mod ensemble;
mod keyed;
mod lock;

pub use aside::cache_aside;
pub use config::{CacheConfig, DEFAULT_PAGE_SIZE, DEFAULT_RECENT_COMMENT_WINDOW};
pub use ensemble::CacheEnsemble;
pub use keyed::KeyedCache;

pub(crate) mod metric_names {
    pub(crate) use super::ensemble::METRIC_CACHE_RESET;
    pub(crate) use super::keyed::{METRIC_CACHE_EVICT, METRIC_CACHE_HIT, METRIC_CACHE_MISS};
}
