#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

use iscogram::application::repos::{
    CommentsRepo, CommentsWriteRepo, CreateCommentParams, CreatePostParams, CreateUserParams,
    HealthRepo, MaintenanceRepo, PostListQuery, PostSelection, PostsRepo, PostsWriteRepo,
    RepoError, SeedBounds, UsersRepo, UsersWriteRepo,
};
use iscogram::cache::CacheConfig;
use iscogram::domain::accounts::calculate_passhash;
use iscogram::domain::entities::{CommentRecord, PostId, PostRecord, UserId, UserRecord};
use iscogram::infra::http::{HttpState, SessionActor, build_router};
use iscogram::infra::images::ImageStorage;

pub const UPLOAD_LIMIT: usize = 1024 * 1024;

/// Store reads the feed path performs, counted per operation.
#[derive(Default)]
pub struct ReadCounters {
    pub user_by_id: AtomicUsize,
    pub comment_counts: AtomicUsize,
    pub recent_comments: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSnapshot {
    pub user_by_id: usize,
    pub comment_counts: usize,
    pub recent_comments: usize,
}

struct Tables {
    users: Vec<UserRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    next_user_id: UserId,
    next_post_id: PostId,
    next_comment_id: i64,
    clock: OffsetDateTime,
}

impl Tables {
    fn tick(&mut self) -> OffsetDateTime {
        self.clock += Duration::seconds(1);
        self.clock
    }
}

/// In-memory stand-in for the Postgres store.
///
/// Seeded rows take explicit ids inside the seed bounds; rows created through
/// the repo traits get ids above them, like a freshly seeded database.
pub struct MemoryStore {
    tables: Mutex<Tables>,
    pub reads: ReadCounters,
}

impl Default for MemoryStore {
    fn default() -> Self {
        let bounds = SeedBounds::default();
        Self {
            tables: Mutex::new(Tables {
                users: Vec::new(),
                posts: Vec::new(),
                comments: Vec::new(),
                next_user_id: bounds.max_user_id + 1,
                next_post_id: bounds.max_post_id + 1,
                next_comment_id: bounds.max_comment_id + 1,
                clock: OffsetDateTime::UNIX_EPOCH + Duration::days(365 * 50),
            }),
            reads: ReadCounters::default(),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_user(&self, id: UserId, account_name: &str, password: &str) -> UserRecord {
        self.seed_user_with(id, account_name, password, 0, 0)
    }

    pub fn seed_admin(&self, id: UserId, account_name: &str, password: &str) -> UserRecord {
        self.seed_user_with(id, account_name, password, 1, 0)
    }

    pub fn seed_user_with(
        &self,
        id: UserId,
        account_name: &str,
        password: &str,
        authority: i32,
        ban_flag: i32,
    ) -> UserRecord {
        let mut tables = self.tables.lock().unwrap();
        let user = UserRecord {
            id,
            account_name: account_name.to_string(),
            passhash: calculate_passhash(account_name, password),
            authority,
            ban_flag,
            created_at: tables.tick(),
        };
        tables.users.push(user.clone());
        user
    }

    pub fn seed_post(&self, id: PostId, user_id: UserId, body: &str) -> PostRecord {
        self.seed_post_with_image(id, user_id, body, "image/png", Vec::new())
    }

    pub fn seed_post_with_image(
        &self,
        id: PostId,
        user_id: UserId,
        body: &str,
        mime: &str,
        image: Vec<u8>,
    ) -> PostRecord {
        let mut tables = self.tables.lock().unwrap();
        let post = PostRecord {
            id,
            user_id,
            image,
            body: body.to_string(),
            mime: mime.to_string(),
            created_at: tables.tick(),
        };
        tables.posts.push(post.clone());
        post
    }

    pub fn seed_comment(&self, id: i64, post_id: PostId, user_id: UserId, text: &str) -> CommentRecord {
        let mut tables = self.tables.lock().unwrap();
        let comment = CommentRecord {
            id,
            post_id,
            user_id,
            comment: text.to_string(),
            created_at: tables.tick(),
        };
        tables.comments.push(comment.clone());
        comment
    }

    pub fn user(&self, id: UserId) -> Option<UserRecord> {
        let tables = self.tables.lock().unwrap();
        tables.users.iter().find(|user| user.id == id).cloned()
    }

    pub fn comment_total(&self, post_id: PostId) -> usize {
        let tables = self.tables.lock().unwrap();
        tables
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .count()
    }

    pub fn post_exists(&self, id: PostId) -> bool {
        let tables = self.tables.lock().unwrap();
        tables.posts.iter().any(|post| post.id == id)
    }

    pub fn reads(&self) -> ReadSnapshot {
        ReadSnapshot {
            user_by_id: self.reads.user_by_id.load(Ordering::SeqCst),
            comment_counts: self.reads.comment_counts.load(Ordering::SeqCst),
            recent_comments: self.reads.recent_comments.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepoError> {
        self.reads.user_by_id.fetch_add(1, Ordering::SeqCst);
        Ok(self.user(id))
    }

    async fn find_by_account_name(
        &self,
        account_name: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .iter()
            .find(|user| user.account_name == account_name)
            .cloned())
    }

    async fn list_active_users(&self) -> Result<Vec<UserRecord>, RepoError> {
        let tables = self.tables.lock().unwrap();
        let mut users: Vec<_> = tables
            .users
            .iter()
            .filter(|user| user.authority == 0 && user.ban_flag == 0)
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }
}

#[async_trait]
impl UsersWriteRepo for MemoryStore {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables.lock().unwrap();
        if tables
            .users
            .iter()
            .any(|user| user.account_name == params.account_name)
        {
            return Err(RepoError::Duplicate {
                constraint: "users_account_name_key".to_string(),
            });
        }
        let user = UserRecord {
            id: tables.next_user_id,
            account_name: params.account_name,
            passhash: params.passhash,
            authority: 0,
            ban_flag: 0,
            created_at: tables.tick(),
        };
        tables.next_user_id += 1;
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn set_ban_flag(&self, id: UserId, flag: i32) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().unwrap();
        match tables.users.iter_mut().find(|user| user.id == id) {
            Some(user) => {
                user.ban_flag = flag;
                Ok(())
            }
            None => Err(RepoError::NotFound),
        }
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn list_posts(&self, query: PostListQuery) -> Result<Vec<PostRecord>, RepoError> {
        let tables = self.tables.lock().unwrap();
        let visible = |post: &PostRecord| {
            !query.visible_authors_only
                || tables
                    .users
                    .iter()
                    .any(|user| user.id == post.user_id && user.ban_flag == 0)
        };
        let mut posts: Vec<_> = tables
            .posts
            .iter()
            .filter(|post| match query.selection {
                PostSelection::Recent => true,
                PostSelection::Before(max) => post.created_at <= max,
                PostSelection::ByUser(user_id) => post.user_id == user_id,
            })
            .filter(|post| visible(post))
            .map(|post| PostRecord {
                image: Vec::new(),
                ..post.clone()
            })
            .collect();
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        if let Some(limit) = query.limit {
            posts.truncate(limit as usize);
        }
        Ok(posts)
    }

    async fn find_post(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.posts.iter().find(|post| post.id == id).cloned())
    }

    async fn count_posts_by_user(&self, user_id: UserId) -> Result<u64, RepoError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .posts
            .iter()
            .filter(|post| post.user_id == user_id)
            .count() as u64)
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.lock().unwrap();
        let post = PostRecord {
            id: tables.next_post_id,
            user_id: params.user_id,
            image: params.image,
            body: params.body,
            mime: params.mime,
            created_at: tables.tick(),
        };
        tables.next_post_id += 1;
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().unwrap();
        tables.posts.retain(|post| post.id != id);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn count_for_post(&self, post_id: PostId) -> Result<u64, RepoError> {
        self.reads.comment_counts.fetch_add(1, Ordering::SeqCst);
        Ok(self.comment_total(post_id) as u64)
    }

    async fn list_recent(
        &self,
        post_id: PostId,
        limit: Option<u32>,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        self.reads.recent_comments.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().unwrap();
        let mut comments: Vec<_> = tables
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        if let Some(limit) = limit {
            comments.truncate(limit as usize);
        }
        Ok(comments)
    }

    async fn count_by_user(&self, user_id: UserId) -> Result<u64, RepoError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .comments
            .iter()
            .filter(|comment| comment.user_id == user_id)
            .count() as u64)
    }

    async fn count_on_posts_of_user(&self, user_id: UserId) -> Result<u64, RepoError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .comments
            .iter()
            .filter(|comment| {
                tables
                    .posts
                    .iter()
                    .any(|post| post.id == comment.post_id && post.user_id == user_id)
            })
            .count() as u64)
    }
}

#[async_trait]
impl CommentsWriteRepo for MemoryStore {
    async fn insert_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut tables = self.tables.lock().unwrap();
        let comment = CommentRecord {
            id: tables.next_comment_id,
            post_id: params.post_id,
            user_id: params.user_id,
            comment: params.comment,
            created_at: tables.tick(),
        };
        tables.next_comment_id += 1;
        tables.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl MaintenanceRepo for MemoryStore {
    async fn reset_to_seed(&self, bounds: SeedBounds) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().unwrap();
        tables.users.retain(|user| user.id <= bounds.max_user_id);
        tables.posts.retain(|post| post.id <= bounds.max_post_id);
        tables
            .comments
            .retain(|comment| comment.id <= bounds.max_comment_id);
        for user in tables.users.iter_mut() {
            user.ban_flag = i32::from(user.id % bounds.ban_every == 0);
        }
        Ok(())
    }
}

#[async_trait]
impl HealthRepo for MemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// Router over `store`, with images written below `image_dir`.
pub fn app(store: Arc<MemoryStore>, image_dir: &std::path::Path) -> (Router, HttpState) {
    let images = Arc::new(ImageStorage::new(image_dir.to_path_buf()).expect("image dir"));
    let state = HttpState::from_store(store, images, CacheConfig::default(), UPLOAD_LIMIT);
    (build_router(state.clone()), state)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// User the session layer resolved for this request.
    pub actor: Option<UserId>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("json body")
    }

    /// `name=value` of the session cookie set by this response.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .find(|pair| pair.starts_with("iscogram_session=") && pair.len() > "iscogram_session=".len())
            .map(str::to_string)
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router responds");
    let status = response.status();
    let headers = response.headers().clone();
    let actor = response
        .extensions()
        .get::<SessionActor>()
        .map(|actor| actor.user_id);
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes()
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
        actor,
    }
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request builds")
}

pub fn form(uri: &str, cookie: Option<&str>, fields: &[(&str, &str)]) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).expect("request builds")
}

pub fn multipart_post(
    cookie: &str,
    csrf_token: &str,
    body: &str,
    content_type: &str,
    image: &[u8],
) -> Request<Body> {
    const BOUNDARY: &str = "iscogram-test-boundary";
    let mut payload = Vec::new();
    for (name, value) in [("csrf_token", csrf_token), ("body", body)] {
        payload.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    payload.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    payload.extend_from_slice(image);
    payload.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(payload))
        .expect("request builds")
}

fn encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

/// Log in through the router and return `(cookie, csrf_token)`.
pub async fn login(router: &Router, account_name: &str, password: &str) -> (String, String) {
    let response = send(
        router,
        form(
            "/login",
            None,
            &[("account_name", account_name), ("password", password)],
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "login should succeed");
    let cookie = response.session_cookie().expect("session cookie");
    let csrf = response.json()["csrf_token"]
        .as_str()
        .expect("csrf token")
        .to_string();
    (cookie, csrf)
}
