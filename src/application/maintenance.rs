use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{MaintenanceRepo, RepoError, SeedBounds};
use crate::cache::CacheEnsemble;
use crate::infra::images::{ImageStorage, ImageStorageError};

#[derive(Debug, Error)]
pub enum MaintenanceError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("failed to prune extracted images: {0}")]
    Images(#[from] ImageStorageError),
}

/// Restores the benchmark seed state.
#[derive(Clone)]
pub struct MaintenanceService {
    repo: Arc<dyn MaintenanceRepo>,
    images: Arc<ImageStorage>,
    caches: Arc<CacheEnsemble>,
    bounds: SeedBounds,
}

impl MaintenanceService {
    pub fn new(
        repo: Arc<dyn MaintenanceRepo>,
        images: Arc<ImageStorage>,
        caches: Arc<CacheEnsemble>,
    ) -> Self {
        Self {
            repo,
            images,
            caches,
            bounds: SeedBounds::default(),
        }
    }

    /// Wipe non-seed rows and the images extracted for them, then drop every
    /// cache entry.
    ///
    /// Caches are cleared only after the store reset commits; a failed reset
    /// leaves them as they were.
    pub async fn initialize(&self) -> Result<(), MaintenanceError> {
        self.repo.reset_to_seed(self.bounds).await?;
        let pruned = self.images.prune_after(self.bounds.max_post_id).await?;
        self.caches.reset_all();
        info!(
            target = "application::maintenance::initialize",
            max_user_id = self.bounds.max_user_id,
            max_post_id = self.bounds.max_post_id,
            max_comment_id = self.bounds.max_comment_id,
            pruned_images = pruned,
            "seed state restored"
        );
        Ok(())
    }
}
