use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CommentsWriteRepo, CreateCommentParams, RepoError};
use crate::application::sync::MutationSync;
use crate::domain::entities::{CommentRecord, PostId, UserRecord};

#[derive(Debug, Error)]
pub enum CommentError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct CommentService {
    writer: Arc<dyn CommentsWriteRepo>,
    sync: MutationSync,
}

impl CommentService {
    pub fn new(writer: Arc<dyn CommentsWriteRepo>, sync: MutationSync) -> Self {
        Self { writer, sync }
    }

    /// Store a comment, then patch the comment caches for its post.
    ///
    /// The caches are only touched once the insert has succeeded.
    pub async fn create_comment(
        &self,
        author: &UserRecord,
        post_id: PostId,
        text: &str,
    ) -> Result<CommentRecord, CommentError> {
        let comment = self
            .writer
            .insert_comment(CreateCommentParams {
                post_id,
                user_id: author.id,
                comment: text.to_string(),
            })
            .await?;

        self.sync.on_comment_created(post_id, &comment);

        info!(
            target = "application::comments::create_comment",
            post_id,
            comment_id = comment.id,
            user_id = author.id,
            "comment created"
        );
        Ok(comment)
    }
}
