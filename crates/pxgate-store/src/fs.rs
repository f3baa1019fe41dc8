//! Filesystem-backed blob store: one file per key under a flat root.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use pxgate_common::StoreError;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::{BlobStore, ByteStream};

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "opened filesystem blob store");
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl BlobStore for FsStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(tokio::fs::try_exists(self.path_for(key)).await?)
    }

    async fn read(&self, key: &str) -> Result<ByteStream, StoreError> {
        let file = tokio::fs::File::open(self.path_for(key)).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::NotFound(key.to_string())
            } else {
                StoreError::Io(e)
            }
        })?;
        Ok(ReaderStream::new(file).boxed())
    }

    async fn read_all(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        tokio::fs::read(self.path_for(key)).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::NotFound(key.to_string())
            } else {
                StoreError::Io(e)
            }
        })
    }

    async fn write(&self, key: &str, bytes: Bytes) -> Result<(), StoreError> {
        tokio::fs::write(self.path_for(key), &bytes).await?;
        debug!(key, size = bytes.len(), "wrote blob");
        Ok(())
    }
}
