//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::images::ImageFormat;

pub type UserId = i64;
pub type PostId = i64;
pub type CommentId = i64;

/// Ban flag value written when an administrator hides a user.
pub const BANNED: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: UserId,
    pub account_name: String,
    #[serde(skip_serializing)]
    pub passhash: String,
    pub authority: i32,
    pub ban_flag: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl UserRecord {
    pub fn is_admin(&self) -> bool {
        self.authority != 0
    }

    /// Banned users are hidden from every feed view.
    pub fn is_banned(&self) -> bool {
        self.ban_flag != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    pub id: PostId,
    pub user_id: UserId,
    /// Empty once the image has been extracted to the image directory.
    #[serde(skip_serializing)]
    pub image: Vec<u8>,
    pub body: String,
    pub mime: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl PostRecord {
    /// Public path of the image, e.g. `/image/42.png`.
    pub fn image_url(&self) -> String {
        match ImageFormat::from_mime(&self.mime) {
            Some(format) => format!("/image/{}.{}", self.id, format.extension()),
            None => format!("/image/{}", self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRecord {
    pub id: CommentId,
    pub post_id: PostId,
    pub user_id: UserId,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HydratedComment {
    #[serde(flatten)]
    pub comment: CommentRecord,
    pub user: UserRecord,
}

/// A post enriched with its author, comment count, and comment window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HydratedPost {
    #[serde(flatten)]
    pub post: PostRecord,
    pub image_url: String,
    pub comment_count: u64,
    /// Oldest comment first.
    pub comments: Vec<HydratedComment>,
    pub user: UserRecord,
}
