use std::sync::Arc;

use crate::{
    application::{
        accounts::AccountService,
        admin::AdminService,
        comments::CommentService,
        feed::FeedAggregator,
        maintenance::MaintenanceService,
        posting::PostingService,
        repos::{
            CommentsRepo, CommentsWriteRepo, HealthRepo, MaintenanceRepo, PostsRepo,
            PostsWriteRepo, UsersRepo, UsersWriteRepo,
        },
        sync::MutationSync,
        timeline::TimelineService,
    },
    cache::{CacheConfig, CacheEnsemble},
    infra::{images::ImageStorage, sessions::SessionStore},
};

#[derive(Clone)]
pub struct HttpState {
    pub accounts: Arc<AccountService>,
    pub timeline: Arc<TimelineService>,
    pub posting: Arc<PostingService>,
    pub comments: Arc<CommentService>,
    pub admin: Arc<AdminService>,
    pub maintenance: Arc<MaintenanceService>,
    pub sessions: Arc<SessionStore>,
    pub health: Arc<dyn HealthRepo>,
    pub caches: Arc<CacheEnsemble>,
    pub upload_limit: usize,
}

impl HttpState {
    /// Wire every service against one store and a fresh cache ensemble.
    pub fn from_store<R>(
        store: Arc<R>,
        images: Arc<ImageStorage>,
        cache: CacheConfig,
        upload_limit: usize,
    ) -> Self
    where
        R: UsersRepo
            + UsersWriteRepo
            + PostsRepo
            + PostsWriteRepo
            + CommentsRepo
            + CommentsWriteRepo
            + MaintenanceRepo
            + HealthRepo
            + 'static,
    {
        let caches = Arc::new(CacheEnsemble::new(&cache));

        let users: Arc<dyn UsersRepo> = store.clone();
        let users_write: Arc<dyn UsersWriteRepo> = store.clone();
        let posts: Arc<dyn PostsRepo> = store.clone();
        let posts_write: Arc<dyn PostsWriteRepo> = store.clone();
        let comments: Arc<dyn CommentsRepo> = store.clone();
        let comments_write: Arc<dyn CommentsWriteRepo> = store.clone();
        let maintenance: Arc<dyn MaintenanceRepo> = store.clone();
        let health: Arc<dyn HealthRepo> = store;

        let feed = FeedAggregator::new(
            caches.clone(),
            users.clone(),
            comments.clone(),
            cache.clone(),
        );
        let sync = MutationSync::new(caches.clone(), cache);

        Self {
            accounts: Arc::new(AccountService::new(
                users.clone(),
                users_write.clone(),
                caches.clone(),
            )),
            timeline: Arc::new(TimelineService::new(
                posts.clone(),
                users.clone(),
                comments,
                feed,
            )),
            posting: Arc::new(PostingService::new(
                posts,
                posts_write,
                images.clone(),
                upload_limit,
            )),
            comments: Arc::new(CommentService::new(comments_write, sync.clone())),
            admin: Arc::new(AdminService::new(users, users_write, sync)),
            maintenance: Arc::new(MaintenanceService::new(
                maintenance,
                images,
                caches.clone(),
            )),
            sessions: Arc::new(SessionStore::new()),
            health,
            caches,
            upload_limit,
        }
    }
}
