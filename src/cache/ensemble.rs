use metrics::counter;
use tracing::info;

use crate::domain::entities::{CommentRecord, PostId, UserId, UserRecord};

use super::config::CacheConfig;
use super::keyed::KeyedCache;

pub(crate) const METRIC_CACHE_RESET: &str = "iscogram_cache_reset_total";

/// The three per-entity caches shared by every request.
///
/// `recent_comments` holds the newest comments of a post, newest first,
/// never more than the configured window.
pub struct CacheEnsemble {
    pub users: KeyedCache<UserId, UserRecord>,
    pub comment_counts: KeyedCache<PostId, u64>,
    pub recent_comments: KeyedCache<PostId, Vec<CommentRecord>>,
}

impl CacheEnsemble {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = config.capacity_non_zero();
        Self {
            users: KeyedCache::with_capacity("users", capacity),
            comment_counts: KeyedCache::with_capacity("comment_counts", capacity),
            recent_comments: KeyedCache::with_capacity("recent_comments", capacity),
        }
    }

    /// Drop every cached entry. Only the initialize endpoint calls this.
    pub fn reset_all(&self) {
        self.users.clear();
        self.comment_counts.clear();
        self.recent_comments.clear();
        counter!(METRIC_CACHE_RESET).increment(1);
        info!(target: "iscogram::cache", "All caches reset");
    }
}

impl Default for CacheEnsemble {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
