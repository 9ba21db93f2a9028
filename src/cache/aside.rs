use std::future::Future;
use std::hash::Hash;

use super::keyed::KeyedCache;

/// Return the cached value for `key`, or load it and populate the cache.
///
/// The cache is written only after `load` succeeds, and no cache lock is held
/// while the loader runs. A failed load leaves the cache untouched.
pub async fn cache_aside<K, V, E, F, Fut>(
    cache: &KeyedCache<K, V>,
    key: K,
    load: F,
) -> Result<V, E>
where
    K: Hash + Eq,
    V: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>>,
{
    if let Some(value) = cache.get(&key) {
        return Ok(value);
    }

    let value = load().await?;
    cache.set(key, value.clone());
    Ok(value)
}
