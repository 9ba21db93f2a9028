//! Cache-aside hydration of raw post rows into feed entries.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::repos::{CommentsRepo, RepoError, UsersRepo};
use crate::cache::{CacheConfig, CacheEnsemble, cache_aside};
use crate::domain::entities::{HydratedComment, HydratedPost, PostId, PostRecord, UserId, UserRecord};

/// How many comments a hydrated post carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentScope {
    /// Feed and profile listings: the newest comments up to the window.
    Summary,
    /// Single-post view: every comment. Never written to the cache.
    All,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("entity store unavailable")]
    StoreUnavailable(#[source] RepoError),
    #[error("required {entity} row is missing")]
    NotFound { entity: &'static str },
}

impl From<RepoError> for FeedError {
    fn from(error: RepoError) -> Self {
        Self::StoreUnavailable(error)
    }
}

#[derive(Clone)]
pub struct FeedAggregator {
    caches: Arc<CacheEnsemble>,
    users: Arc<dyn UsersRepo>,
    comments: Arc<dyn CommentsRepo>,
    config: CacheConfig,
}

impl FeedAggregator {
    pub fn new(
        caches: Arc<CacheEnsemble>,
        users: Arc<dyn UsersRepo>,
        comments: Arc<dyn CommentsRepo>,
        config: CacheConfig,
    ) -> Self {
        Self {
            caches,
            users,
            comments,
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Hydrate posts in input order, dropping posts by banned authors and
    /// stopping once a full page of visible posts has been produced.
    ///
    /// Any store failure aborts the whole call; no partial page is returned.
    pub async fn hydrate(
        &self,
        raw_posts: Vec<PostRecord>,
        scope: CommentScope,
    ) -> Result<Vec<HydratedPost>, FeedError> {
        let page_size = self.config.page_size_non_zero().get();
        let candidates = raw_posts.len();
        let mut hidden = 0usize;
        let mut hydrated = Vec::with_capacity(candidates.min(page_size));

        for post in raw_posts {
            if hydrated.len() >= page_size {
                break;
            }

            let comment_count = self.comment_count(post.id).await?;
            let comments = self.comments_for(post.id, scope).await?;
            let user = self.user(post.user_id).await?;

            if user.is_banned() {
                hidden += 1;
                continue;
            }

            let image_url = post.image_url();
            hydrated.push(HydratedPost {
                post,
                image_url,
                comment_count,
                comments,
                user,
            });
        }

        debug!(
            target = "application::feed::hydrate",
            candidates,
            hidden,
            emitted = hydrated.len(),
            scope = ?scope,
            "feed page hydrated"
        );

        Ok(hydrated)
    }

    async fn comment_count(&self, post_id: PostId) -> Result<u64, FeedError> {
        let comments = &self.comments;
        let count = cache_aside(&self.caches.comment_counts, post_id, move || async move {
            comments.count_for_post(post_id).await
        })
        .await?;
        Ok(count)
    }

    async fn comments_for(
        &self,
        post_id: PostId,
        scope: CommentScope,
    ) -> Result<Vec<HydratedComment>, FeedError> {
        let window = self.config.recent_comment_window;
        let records = match scope {
            CommentScope::Summary => {
                let comments = &self.comments;
                let limit = u32::try_from(window).unwrap_or(u32::MAX);
                let mut cached =
                    cache_aside(&self.caches.recent_comments, post_id, move || async move {
                        comments.list_recent(post_id, Some(limit)).await
                    })
                    .await?;
                cached.truncate(window);
                cached
            }
            CommentScope::All => self.comments.list_recent(post_id, None).await?,
        };

        let mut hydrated = Vec::with_capacity(records.len());
        for comment in records {
            let user = self.user(comment.user_id).await?;
            hydrated.push(HydratedComment { comment, user });
        }
        // Store order is newest first; display order is oldest first.
        hydrated.reverse();
        Ok(hydrated)
    }

    async fn user(&self, user_id: UserId) -> Result<UserRecord, FeedError> {
        let users = &self.users;
        cache_aside(&self.caches.users, user_id, move || async move {
            users
                .find_by_id(user_id)
                .await
                .map_err(FeedError::from)
                .and_then(|found| found.ok_or(FeedError::NotFound { entity: "user" }))
        })
        .await
    }
}
