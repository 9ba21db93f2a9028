//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{CommentRecord, PostId, PostRecord, UserId, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which posts a feed page is selected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSelection {
    /// Newest posts across all visible authors.
    Recent,
    /// Posts created at or before the given instant.
    Before(OffsetDateTime),
    /// Every post by one author.
    ByUser(UserId),
}

/// Row selection for a feed page. Results are ordered newest first.
///
/// `visible_authors_only` pushes the ban filter into the query so the
/// aggregator receives enough candidates to fill a page. The aggregator still
/// re-checks each author against its cache.
#[derive(Debug, Clone, Copy)]
pub struct PostListQuery {
    pub selection: PostSelection,
    pub visible_authors_only: bool,
    pub limit: Option<u32>,
}

impl PostListQuery {
    pub fn recent(limit: u32) -> Self {
        Self {
            selection: PostSelection::Recent,
            visible_authors_only: true,
            limit: Some(limit),
        }
    }

    pub fn before(max_created_at: OffsetDateTime, limit: u32) -> Self {
        Self {
            selection: PostSelection::Before(max_created_at),
            visible_authors_only: true,
            limit: Some(limit),
        }
    }

    pub fn by_user(user_id: UserId) -> Self {
        Self {
            selection: PostSelection::ByUser(user_id),
            visible_authors_only: false,
            limit: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub account_name: String,
    pub passhash: String,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub user_id: UserId,
    pub mime: String,
    pub body: String,
    /// Stored in the row; empty once the image lives on disk.
    pub image: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: PostId,
    pub user_id: UserId,
    pub comment: String,
}

/// Row ids above these bounds are removed by the initialize operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedBounds {
    pub max_user_id: UserId,
    pub max_post_id: PostId,
    pub max_comment_id: i64,
    /// Users whose id is a multiple of this are banned after the reset.
    pub ban_every: i64,
}

impl Default for SeedBounds {
    fn default() -> Self {
        Self {
            max_user_id: 1000,
            max_post_id: 10_000,
            max_comment_id: 100_000,
            ban_every: 50,
        }
    }
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_account_name(
        &self,
        account_name: &str,
    ) -> Result<Option<UserRecord>, RepoError>;

    /// Normal (non-admin) users that are not banned, newest first.
    async fn list_active_users(&self) -> Result<Vec<UserRecord>, RepoError>;
}

#[async_trait]
pub trait UsersWriteRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn set_ban_flag(&self, id: UserId, flag: i32) -> Result<(), RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Post rows without image payloads.
    async fn list_posts(&self, query: PostListQuery) -> Result<Vec<PostRecord>, RepoError>;

    /// A single post row including its stored image payload.
    async fn find_post(&self, id: PostId) -> Result<Option<PostRecord>, RepoError>;

    async fn count_posts_by_user(&self, user_id: UserId) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn count_for_post(&self, post_id: PostId) -> Result<u64, RepoError>;

    /// Comments on a post, newest first. `None` returns every comment.
    async fn list_recent(
        &self,
        post_id: PostId,
        limit: Option<u32>,
    ) -> Result<Vec<CommentRecord>, RepoError>;

    /// Comments written by the user.
    async fn count_by_user(&self, user_id: UserId) -> Result<u64, RepoError>;

    /// Comments written on any of the user's posts.
    async fn count_on_posts_of_user(&self, user_id: UserId) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait CommentsWriteRepo: Send + Sync {
    async fn insert_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait MaintenanceRepo: Send + Sync {
    /// Delete non-seed rows and reset ban flags in one transaction.
    async fn reset_to_seed(&self, bounds: SeedBounds) -> Result<(), RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
