//! Administrator operations: listing and banning users.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{RepoError, UsersRepo, UsersWriteRepo};
use crate::application::sync::MutationSync;
use crate::domain::entities::{BANNED, UserId, UserRecord};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("user {0} is not an administrator")]
    Forbidden(UserId),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct AdminService {
    reader: Arc<dyn UsersRepo>,
    writer: Arc<dyn UsersWriteRepo>,
    sync: MutationSync,
}

impl AdminService {
    pub fn new(
        reader: Arc<dyn UsersRepo>,
        writer: Arc<dyn UsersWriteRepo>,
        sync: MutationSync,
    ) -> Self {
        Self {
            reader,
            writer,
            sync,
        }
    }

    fn ensure_admin(actor: &UserRecord) -> Result<(), AdminError> {
        if actor.is_admin() {
            Ok(())
        } else {
            Err(AdminError::Forbidden(actor.id))
        }
    }

    /// Normal users that can still be banned, newest first.
    pub async fn list_active_users(
        &self,
        actor: &UserRecord,
    ) -> Result<Vec<UserRecord>, AdminError> {
        Self::ensure_admin(actor)?;
        Ok(self.reader.list_active_users().await?)
    }

    /// Ban each user in order. Stops at the first failed write; users banned
    /// before the failure keep their patched cache entries.
    pub async fn ban(&self, actor: &UserRecord, user_ids: &[UserId]) -> Result<usize, AdminError> {
        Self::ensure_admin(actor)?;

        for &user_id in user_ids {
            self.writer.set_ban_flag(user_id, BANNED).await?;
            self.sync.on_user_banned(user_id);
        }

        info!(
            target = "application::admin::ban",
            actor_id = actor.id,
            banned = user_ids.len(),
            "users banned"
        );
        Ok(user_ids.len())
    }
}
