//! Postgres repository checks. Run with `DATABASE_URL` set and `--ignored`.

use sqlx::PgPool;

use iscogram::application::repos::{
    CommentsRepo, CommentsWriteRepo, CreateCommentParams, CreatePostParams, CreateUserParams,
    MaintenanceRepo, PostListQuery, PostsRepo, PostsWriteRepo, RepoError, SeedBounds, UsersRepo,
    UsersWriteRepo,
};
use iscogram::domain::entities::BANNED;
use iscogram::infra::db::PostgresRepositories;

async fn user(repos: &PostgresRepositories, name: &str) -> i64 {
    repos
        .create_user(CreateUserParams {
            account_name: name.to_string(),
            passhash: "hash".to_string(),
        })
        .await
        .expect("user created")
        .id
}

async fn post(repos: &PostgresRepositories, user_id: i64) -> i64 {
    repos
        .create_post(CreatePostParams {
            user_id,
            mime: "image/png".to_string(),
            body: "caption".to_string(),
            image: b"png".to_vec(),
        })
        .await
        .expect("post created")
        .id
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn listings_hide_banned_authors_and_omit_payloads(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let mary = user(&repos, "mary").await;
    let bob = user(&repos, "bob").await;
    let visible = post(&repos, mary).await;
    post(&repos, bob).await;
    repos.set_ban_flag(bob, BANNED).await.expect("ban");

    let listed = repos
        .list_posts(PostListQuery::recent(20))
        .await
        .expect("listed");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, visible);
    assert!(listed[0].image.is_empty());

    let by_bob = repos
        .list_posts(PostListQuery::by_user(bob))
        .await
        .expect("listed");
    assert_eq!(by_bob.len(), 1);

    let full = repos
        .find_post(visible)
        .await
        .expect("found")
        .expect("present");
    assert_eq!(full.image, b"png");
    assert_eq!(repos.count_posts_by_user(mary).await.expect("count"), 1);

    let duplicate = repos
        .create_user(CreateUserParams {
            account_name: "mary".to_string(),
            passhash: "other".to_string(),
        })
        .await;
    assert!(matches!(duplicate, Err(RepoError::Duplicate { .. })));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn comments_are_listed_newest_first(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let mary = user(&repos, "mary").await;
    let bob = user(&repos, "bob").await;
    let post_id = post(&repos, mary).await;

    let mut inserted = Vec::new();
    for text in ["one", "two", "three", "four"] {
        let comment = repos
            .insert_comment(CreateCommentParams {
                post_id,
                user_id: bob,
                comment: text.to_string(),
            })
            .await
            .expect("comment inserted");
        inserted.push(comment.id);
    }

    let recent = repos
        .list_recent(post_id, Some(3))
        .await
        .expect("recent listed");
    let ids: Vec<_> = recent.iter().map(|comment| comment.id).collect();
    let expected: Vec<_> = inserted.iter().rev().take(3).copied().collect();
    assert_eq!(ids, expected);

    assert_eq!(
        repos.list_recent(post_id, None).await.expect("all").len(),
        4
    );
    assert_eq!(repos.count_for_post(post_id).await.expect("count"), 4);
    assert_eq!(repos.count_by_user(bob).await.expect("count"), 4);
    assert_eq!(repos.count_on_posts_of_user(mary).await.expect("count"), 4);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn reset_to_seed_removes_rows_beyond_the_bounds_without_reusing_ids(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let first = user(&repos, "first").await;
    let second = user(&repos, "second").await;
    let kept_post = post(&repos, first).await;
    post(&repos, second).await;
    repos.set_ban_flag(first, BANNED).await.expect("ban");

    let bounds = SeedBounds {
        max_user_id: first,
        max_post_id: kept_post,
        max_comment_id: 0,
        ban_every: 1_000_000,
    };
    repos.reset_to_seed(bounds).await.expect("reset");

    let restored = repos
        .find_by_id(first)
        .await
        .expect("lookup")
        .expect("seed user kept");
    assert_eq!(restored.ban_flag, 0);
    assert!(repos.find_by_id(second).await.expect("lookup").is_none());
    assert!(repos.find_post(kept_post + 1).await.expect("lookup").is_none());

    // Ids of removed rows are never handed out again.
    let again = user(&repos, "again").await;
    assert!(again > second);
}
