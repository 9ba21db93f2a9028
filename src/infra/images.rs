//! Filesystem storage for post images extracted from the database.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};

use crate::domain::entities::PostId;
use crate::domain::images::ImageFormat;

#[derive(Debug, Error)]
pub enum ImageStorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Directory of `{post_id}.{ext}` files.
#[derive(Debug)]
pub struct ImageStorage {
    root: PathBuf,
}

impl ImageStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_name(post_id: PostId, format: ImageFormat) -> String {
        format!("{post_id}.{}", format.extension())
    }

    fn path_for(&self, post_id: PostId, format: ImageFormat) -> PathBuf {
        self.root.join(Self::file_name(post_id, format))
    }

    /// Write the image, replacing any existing file. A partial file is removed
    /// when the write fails.
    pub async fn write(
        &self,
        post_id: PostId,
        format: ImageFormat,
        data: &[u8],
    ) -> Result<(), ImageStorageError> {
        let path = self.path_for(post_id, format);
        let mut file = fs::File::create(&path).await?;
        let written = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;

        if let Err(err) = written {
            drop(file);
            let _ = fs::remove_file(&path).await;
            return Err(err.into());
        }
        Ok(())
    }

    /// Read the stored image. Missing files are `Ok(None)`.
    pub async fn read(
        &self,
        post_id: PostId,
        format: ImageFormat,
    ) -> Result<Option<Bytes>, ImageStorageError> {
        match fs::read(self.path_for(post_id, format)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove every `{post_id}.{ext}` file whose id is above `max_post_id`.
    /// Files that do not follow the naming scheme are left alone. Returns the
    /// number of files removed.
    pub async fn prune_after(&self, max_post_id: PostId) -> Result<usize, ImageStorageError> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(post_id) = Self::post_id_of(&path) else {
                continue;
            };
            if post_id <= max_post_id {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(removed)
    }

    fn post_id_of(path: &Path) -> Option<PostId> {
        let extension = path.extension()?.to_str()?;
        ImageFormat::from_extension(extension)?;
        path.file_stem()?.to_str()?.parse().ok()
    }
}
