use async_trait::async_trait;

use crate::application::repos::{MaintenanceRepo, RepoError, SeedBounds};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl MaintenanceRepo for PostgresRepositories {
    async fn reset_to_seed(&self, bounds: SeedBounds) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM users WHERE id > $1")
            .bind(bounds.max_user_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        sqlx::query("DELETE FROM posts WHERE id > $1")
            .bind(bounds.max_post_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        sqlx::query("DELETE FROM comments WHERE id > $1")
            .bind(bounds.max_comment_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        sqlx::query("UPDATE users SET ban_flag = 0")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        sqlx::query("UPDATE users SET ban_flag = 1 WHERE id % $1 = 0")
            .bind(bounds.ban_every)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)
    }
}
