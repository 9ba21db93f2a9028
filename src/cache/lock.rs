use std::sync::{LockResult, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

/// Unwrap a lock result, keeping the inner state when a writer panicked.
///
/// Cache entries are plain snapshots of store rows, so a half-finished
/// update is at worst stale and the next miss repopulates it.
fn recover<G>(
    result: LockResult<G>,
    cache: &'static str,
    lock_kind: &'static str,
    op: &'static str,
) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            target: "iscogram::cache::lock",
            cache,
            op,
            lock_kind,
            result = "poisoned_recovered",
            "Recovered from poisoned cache lock"
        );
        poisoned.into_inner()
    })
}

pub(crate) fn read<'a, T>(
    lock: &'a RwLock<T>,
    cache: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), cache, "rwlock.read", op)
}

pub(crate) fn write<'a, T>(
    lock: &'a RwLock<T>,
    cache: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), cache, "rwlock.write", op)
}
