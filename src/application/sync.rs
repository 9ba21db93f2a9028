//! Write-side cache patches applied after a store mutation succeeds.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheConfig, CacheEnsemble};
use crate::domain::entities::{BANNED, CommentRecord, PostId, UserId};

/// Patches cached entries in place after a successful store write.
///
/// Absent keys are left absent: the next hydration reads the true value from
/// the store instead of caching a guess. Nothing here touches the store.
#[derive(Clone)]
pub struct MutationSync {
    caches: Arc<CacheEnsemble>,
    window: usize,
}

impl MutationSync {
    pub fn new(caches: Arc<CacheEnsemble>, config: CacheConfig) -> Self {
        Self {
            caches,
            window: config.recent_comment_window,
        }
    }

    pub fn on_comment_created(&self, post_id: PostId, comment: &CommentRecord) {
        let counted = self
            .caches
            .comment_counts
            .update(&post_id, |count| *count += 1);

        let window = self.window;
        let listed = self.caches.recent_comments.update(&post_id, |recent| {
            recent.insert(0, comment.clone());
            recent.truncate(window);
        });

        debug!(
            target = "application::sync::on_comment_created",
            post_id,
            comment_id = comment.id,
            counted,
            listed,
            "comment caches patched"
        );
    }

    pub fn on_user_banned(&self, user_id: UserId) {
        let patched = self
            .caches
            .users
            .update(&user_id, |user| user.ban_flag = BANNED);

        debug!(
            target = "application::sync::on_user_banned",
            user_id, patched, "user cache patched"
        );
    }
}
