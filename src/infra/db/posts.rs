use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
    application::repos::{
        CreatePostParams, PostListQuery, PostSelection, PostsRepo, PostsWriteRepo, RepoError,
    },
    domain::entities::{PostId, PostRecord, UserId},
};

use super::{PostgresRepositories, map_sqlx_error};

/// Feed listings never load image payloads.
#[derive(sqlx::FromRow)]
struct PostSummaryRow {
    id: i64,
    user_id: i64,
    body: String,
    mime: String,
    created_at: OffsetDateTime,
}

impl From<PostSummaryRow> for PostRecord {
    fn from(row: PostSummaryRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            image: Vec::new(),
            body: row.body,
            mime: row.mime,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    user_id: i64,
    imgdata: Vec<u8>,
    body: String,
    mime: String,
    created_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            image: row.imgdata,
            body: row.body,
            mime: row.mime,
            created_at: row.created_at,
        }
    }
}

impl PostgresRepositories {
    fn apply_post_selection(qb: &mut QueryBuilder<'_, Postgres>, selection: PostSelection) {
        match selection {
            PostSelection::Recent => {}
            PostSelection::Before(max_created_at) => {
                qb.push(" AND p.created_at <= ");
                qb.push_bind(max_created_at);
            }
            PostSelection::ByUser(user_id) => {
                qb.push(" AND p.user_id = ");
                qb.push_bind(user_id);
            }
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(&self, query: PostListQuery) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT p.id, p.user_id, p.body, p.mime, p.created_at FROM posts p ",
        );
        if query.visible_authors_only {
            qb.push("INNER JOIN users u ON u.id = p.user_id AND u.ban_flag = 0 ");
        }
        qb.push("WHERE TRUE");
        Self::apply_post_selection(&mut qb, query.selection);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC");
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ");
            qb.push_bind(i64::from(limit));
        }

        let rows = qb
            .build_query_as::<PostSummaryRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn find_post(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, user_id, imgdata, body, mime, created_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn count_posts_by_user(&self, user_id: UserId) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            INSERT INTO posts (user_id, mime, imgdata, body)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, imgdata, body, mime, created_at
            "#,
        )
        .bind(params.user_id)
        .bind(&params.mime)
        .bind(&params.image)
        .bind(&params.body)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
