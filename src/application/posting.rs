//! Image post creation and image delivery.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{CreatePostParams, PostsRepo, PostsWriteRepo, RepoError};
use crate::domain::entities::{PostId, PostRecord, UserRecord};
use crate::domain::images::ImageFormat;
use crate::infra::images::{ImageStorage, ImageStorageError};

#[derive(Debug, Error)]
pub enum PostingError {
    #[error("image must be jpeg, png or gif")]
    UnsupportedImage,
    #[error("image is empty")]
    EmptyImage,
    #[error("image exceeds {limit} bytes")]
    ImageTooLarge { limit: usize },
    #[error("image not found")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] ImageStorageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// An upload as received from the client, validated by `create_post`.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub content_type: String,
    pub body: String,
    pub data: Bytes,
}

#[derive(Debug, Clone)]
pub struct StoredImage {
    pub mime: &'static str,
    pub data: Bytes,
}

#[derive(Clone)]
pub struct PostingService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    storage: Arc<ImageStorage>,
    max_bytes: usize,
}

impl PostingService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        storage: Arc<ImageStorage>,
        max_bytes: usize,
    ) -> Self {
        Self {
            reader,
            writer,
            storage,
            max_bytes,
        }
    }

    /// Store the post row with an empty payload, then write the image file.
    ///
    /// If the file cannot be written the row is deleted again.
    pub async fn create_post(
        &self,
        author: &UserRecord,
        upload: NewPost,
    ) -> Result<PostRecord, PostingError> {
        let format = ImageFormat::from_content_type(&upload.content_type)
            .ok_or(PostingError::UnsupportedImage)?;
        if upload.data.is_empty() {
            return Err(PostingError::EmptyImage);
        }
        if upload.data.len() > self.max_bytes {
            return Err(PostingError::ImageTooLarge {
                limit: self.max_bytes,
            });
        }

        let post = self
            .writer
            .create_post(CreatePostParams {
                user_id: author.id,
                mime: format.mime().to_string(),
                body: upload.body,
                image: Vec::new(),
            })
            .await?;

        if let Err(err) = self.storage.write(post.id, format, &upload.data).await {
            warn!(
                target = "application::posting::create_post",
                post_id = post.id,
                error = %err,
                "image write failed, removing post row"
            );
            if let Err(cleanup) = self.writer.delete_post(post.id).await {
                warn!(
                    target = "application::posting::create_post",
                    post_id = post.id,
                    error = %cleanup,
                    "post row cleanup failed"
                );
            }
            return Err(err.into());
        }

        info!(
            target = "application::posting::create_post",
            post_id = post.id,
            user_id = author.id,
            size_bytes = upload.data.len(),
            mime = format.mime(),
            "post created"
        );
        Ok(post)
    }

    /// Serve `{post_id}.{extension}` from disk, falling back to the payload
    /// stored in the row when the extension matches the post's mime type.
    /// The fallback extracts the payload to disk for later requests.
    pub async fn image(
        &self,
        post_id: PostId,
        extension: &str,
    ) -> Result<StoredImage, PostingError> {
        let format = ImageFormat::from_extension(extension).ok_or(PostingError::NotFound)?;

        if let Some(data) = self.storage.read(post_id, format).await? {
            return Ok(StoredImage {
                mime: format.mime(),
                data,
            });
        }

        let post = self
            .reader
            .find_post(post_id)
            .await?
            .ok_or(PostingError::NotFound)?;
        if ImageFormat::from_mime(&post.mime) != Some(format) || post.image.is_empty() {
            return Err(PostingError::NotFound);
        }

        if let Err(err) = self.storage.write(post_id, format, &post.image).await {
            warn!(
                target = "application::posting::image",
                post_id,
                error = %err,
                "image extraction failed"
            );
        }

        Ok(StoredImage {
            mime: format.mime(),
            data: Bytes::from(post.image),
        })
    }
}
