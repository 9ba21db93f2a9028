//! Cache configuration.
//!
//! Controls feed page size, the recent-comment window, and the optional
//! per-cache capacity via the `[cache]` settings section.

use std::num::NonZeroUsize;

use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_RECENT_COMMENT_WINDOW: usize = 3;

/// Cache and feed shaping configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of visible posts on one feed page.
    pub page_size: usize,
    /// Number of newest comments shown per post in summary views.
    pub recent_comment_window: usize,
    /// Per-cache entry limit; `None` keeps every entry until reset.
    pub capacity: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            recent_comment_window: DEFAULT_RECENT_COMMENT_WINDOW,
            capacity: None,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            page_size: settings.page_size.get(),
            recent_comment_window: settings.recent_comment_window.get(),
            capacity: settings.capacity.map(NonZeroUsize::get),
        }
    }
}

impl CacheConfig {
    /// Returns the capacity as NonZeroUsize; zero is treated as unbounded.
    pub fn capacity_non_zero(&self) -> Option<NonZeroUsize> {
        self.capacity.and_then(NonZeroUsize::new)
    }

    /// Returns the page size, clamping to 1 if zero.
    pub fn page_size_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.page_size).unwrap_or(NonZeroUsize::MIN)
    }
}
