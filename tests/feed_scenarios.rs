mod support;

use std::sync::Arc;

use iscogram::application::feed::{CommentScope, FeedAggregator};
use iscogram::application::repos::{PostListQuery, PostSelection, PostsRepo};
use iscogram::cache::{CacheConfig, CacheEnsemble};

use support::MemoryStore;

#[tokio::test]
async fn banned_authors_in_an_unfiltered_listing_do_not_consume_page_slots() {
    let store = MemoryStore::new();
    store.seed_user(1, "mary", "password1");
    store.seed_user_with(2, "spammer", "password1", 0, 1);
    for id in 1..=25 {
        store.seed_post(id, 1, "visible");
    }
    for id in 26..=35 {
        store.seed_post(id, 2, "hidden");
    }
    let config = CacheConfig::default();
    let caches = Arc::new(CacheEnsemble::new(&config));
    let feed = FeedAggregator::new(caches, store.clone(), store.clone(), config);

    // The banned author's newer posts head the listing.
    let raw = store
        .list_posts(PostListQuery {
            selection: PostSelection::Recent,
            visible_authors_only: false,
            limit: None,
        })
        .await
        .expect("posts listed");
    assert_eq!(raw.len(), 35);
    assert_eq!(raw[0].user_id, 2);

    let page = feed
        .hydrate(raw, CommentScope::Summary)
        .await
        .expect("hydrated");

    assert_eq!(page.len(), 20);
    assert!(page.iter().all(|post| post.user.id == 1));
    let ids: Vec<_> = page.iter().map(|post| post.post.id).collect();
    assert_eq!(ids, (6..=25).rev().collect::<Vec<_>>());
}
