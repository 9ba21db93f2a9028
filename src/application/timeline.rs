//! Read-side feed views: index, paging, profiles and post detail.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::feed::{CommentScope, FeedAggregator, FeedError};
use crate::application::repos::{
    CommentsRepo, PostListQuery, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{HydratedPost, PostId, UserRecord};

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A user's public page with activity counters.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub user: UserRecord,
    pub posts: Vec<HydratedPost>,
    pub post_count: u64,
    /// Comments written by the user.
    pub comment_count: u64,
    /// Comments received on the user's posts.
    pub commented_count: u64,
}

#[derive(Clone)]
pub struct TimelineService {
    posts: Arc<dyn PostsRepo>,
    users: Arc<dyn UsersRepo>,
    comments: Arc<dyn CommentsRepo>,
    feed: FeedAggregator,
}

impl TimelineService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        users: Arc<dyn UsersRepo>,
        comments: Arc<dyn CommentsRepo>,
        feed: FeedAggregator,
    ) -> Self {
        Self {
            posts,
            users,
            comments,
            feed,
        }
    }

    fn page_limit(&self) -> u32 {
        u32::try_from(self.feed.config().page_size_non_zero().get()).unwrap_or(u32::MAX)
    }

    pub async fn index(&self) -> Result<Vec<HydratedPost>, TimelineError> {
        let raw = self
            .posts
            .list_posts(PostListQuery::recent(self.page_limit()))
            .await?;
        Ok(self.feed.hydrate(raw, CommentScope::Summary).await?)
    }

    /// The page of posts created at or before `max_created_at`.
    ///
    /// An empty page is reported as not found so clients stop paging.
    pub async fn posts_before(
        &self,
        max_created_at: OffsetDateTime,
    ) -> Result<Vec<HydratedPost>, TimelineError> {
        let raw = self
            .posts
            .list_posts(PostListQuery::before(max_created_at, self.page_limit()))
            .await?;
        let posts = self.feed.hydrate(raw, CommentScope::Summary).await?;
        if posts.is_empty() {
            return Err(TimelineError::NotFound("posts"));
        }
        Ok(posts)
    }

    pub async fn profile(&self, account_name: &str) -> Result<ProfileView, TimelineError> {
        let user = self
            .users
            .find_by_account_name(account_name)
            .await?
            .filter(|user| !user.is_banned())
            .ok_or(TimelineError::NotFound("user"))?;

        let raw = self.posts.list_posts(PostListQuery::by_user(user.id)).await?;
        let posts = self.feed.hydrate(raw, CommentScope::Summary).await?;

        let post_count = self.posts.count_posts_by_user(user.id).await?;
        let comment_count = self.comments.count_by_user(user.id).await?;
        let commented_count = self.comments.count_on_posts_of_user(user.id).await?;

        Ok(ProfileView {
            user,
            posts,
            post_count,
            comment_count,
            commented_count,
        })
    }

    /// A single post with every comment. Posts by banned authors are hidden.
    pub async fn post_detail(&self, post_id: PostId) -> Result<HydratedPost, TimelineError> {
        let mut post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(TimelineError::NotFound("post"))?;
        post.image = Vec::new();

        self.feed
            .hydrate(vec![post], CommentScope::All)
            .await?
            .into_iter()
            .next()
            .ok_or(TimelineError::NotFound("post"))
    }
}
